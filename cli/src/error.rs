//! Centralized error types for siteship
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.
//!
//! Nothing in the core retries: every failure is surfaced to the caller
//! with a message and a [`ErrorKind`] the CLI maps to user-facing output.

use thiserror::Error;

/// Coarse classification of a [`DeployError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Transport,
    Timeout,
    ProtectedResource,
    Cancelled,
    Filesystem,
    Config,
}

impl ErrorKind {
    /// Process exit code for this kind of failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::NotFound => 3,
            Self::Transport => 4,
            Self::Timeout => 5,
            Self::ProtectedResource => 6,
            Self::Filesystem => 7,
            Self::Config => 8,
            Self::Cancelled => 130,
        }
    }

    /// Classify an error that reached the command layer
    ///
    /// Looks through `anyhow` context for the first typed error in the chain.
    pub fn of(err: &anyhow::Error) -> Option<Self> {
        err.chain().find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<DeployError>() {
                Some(e.kind())
            } else if cause.is::<ValidationError>() {
                Some(Self::Validation)
            } else if cause.is::<NotFoundError>() {
                Some(Self::NotFound)
            } else if cause.is::<TransportError>() {
                Some(Self::Transport)
            } else if cause.is::<ConfigError>() {
                Some(Self::Config)
            } else {
                None
            }
        })
    }
}

/// Top-level error type for siteship operations
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(
        "Deployment status polling timed out after {attempts} attempts \
         ({reported}/{expected} environments reported)"
    )]
    Timeout {
        attempts: u32,
        reported: usize,
        expected: usize,
    },

    #[error("Environment '{name}' is protected and cannot be deleted")]
    ProtectedResource { name: String },

    #[error("Publish was cancelled")]
    Cancelled,

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DeployError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ProtectedResource { .. } => ErrorKind::ProtectedResource,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Wrap an io error with the path it happened at
    pub fn filesystem(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Malformed input rejected before any backend call
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid domain name '{name}': expected dot-separated labels of [a-z0-9-], 1-63 chars, no leading or trailing hyphen")]
    InvalidDomainName { name: String },

    #[error("Invalid environment name '{name}': expected 1-63 chars of [a-z0-9-], no leading or trailing hyphen")]
    InvalidEnvironmentName { name: String },

    #[error("Invalid deploy key '{key}': expected 8 lowercase hex characters")]
    InvalidDeployKey { key: String },

    #[error("Environment '{name}' already exists implicitly and cannot be created")]
    ReservedEnvironment { name: String },

    #[error("Selection {index} is out of range (list has {len} items)")]
    SelectionOutOfRange { index: usize, len: usize },

    #[error("No valid items selected")]
    EmptySelection,
}

/// Missing collections or local inputs
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("No {collection} found for site '{site}'")]
    NoResults {
        collection: &'static str,
        site: String,
    },

    #[error("Source directory not found: {path}")]
    SourceDirectory { path: String },

    #[error("Server bundle not found: {path}")]
    Bundle { path: String },
}

/// Network and backend failures, propagated untransformed
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("{operation} request failed: {message}")]
    Request { operation: String, message: String },

    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {operation} response: {message}")]
    Decode { operation: String, message: String },
}

impl TransportError {
    /// Request-level failure (connect, timeout, body stream)
    pub fn request(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Request {
            operation: operation.into(),
            message: err.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required configuration missing: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("API token not found. Pass --token, set SITESHIP_TOKEN, or add `token:` to ~/.siteship/credentials.yaml")]
    TokenNotFound,
}
