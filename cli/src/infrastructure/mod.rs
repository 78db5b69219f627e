//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Hosting backend API
//! - Blob storage uploads
//! - Archive packaging on the local filesystem
//! - Token discovery
//! - Third-party integrations

pub mod api_client;
pub mod auth;
pub mod backend;
pub mod blob_store;
pub mod integrations;
pub mod packager;

// Re-export commonly used types
pub use api_client::ApiClient;
pub use auth::AuthToken;
pub use backend::{SiteBackend, StatusSource};
pub use blob_store::{BlobStore, UploadMetadata, UploadProgress};
pub use integrations::Integration;
pub use packager::Packager;
