//! Blob storage uploads
//!
//! Streams an archive to `{blob_url}/{key}` and publishes transfer progress
//! on a watch channel. Subscribers can await changes or read the latest
//! value at any time; the transfer itself knows nothing about how progress
//! is rendered.

use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::auth::AuthToken;
use crate::domain::Reference;
use crate::error::{DeployError, TransportError};

/// Storage key for an uploaded site archive
///
/// Partitioned by user id and content hash, so publishes from different
/// users or of different code never share a key.
pub fn blob_key(user_id: &str, site_name: &str, code_id: &str) -> String {
    format!("{}/{}-{}.zip", user_id, site_name, code_id)
}

/// Object metadata attached to an upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub description: String,
    pub reference: Reference,
}

/// Bytes transferred so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub transferred: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.transferred >= self.total
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub key: String,
    pub bytes: u64,
    pub etag: Option<String>,
}

/// Client for blob storage uploads
pub struct BlobStore {
    client: Client,
    base_url: String,
    token: AuthToken,
    progress: Arc<watch::Sender<UploadProgress>>,
}

impl BlobStore {
    /// Create a new blob store client
    pub fn new(base_url: impl Into<String>, token: AuthToken) -> Result<Self, DeployError> {
        // Uploads can be large: only bound the connect phase.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::request("client setup", e))?;
        let (progress, _) = watch::channel(UploadProgress::default());

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            progress: Arc::new(progress),
        })
    }

    /// Subscribe to transfer progress
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    /// Stream `archive` to storage under `key`
    pub async fn upload(
        &self,
        archive: &Path,
        key: &str,
        metadata: &UploadMetadata,
    ) -> Result<UploadReceipt, DeployError> {
        let file = tokio::fs::File::open(archive)
            .await
            .map_err(|e| DeployError::filesystem(archive, e))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| DeployError::filesystem(archive, e))?
            .len();

        self.progress.send_replace(UploadProgress {
            transferred: 0,
            total,
        });

        let progress = Arc::clone(&self.progress);
        let mut transferred = 0u64;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                transferred += bytes.len() as u64;
                progress.send_replace(UploadProgress { transferred, total });
            }
            chunk
        });

        let url = format!("{}/{}", self.base_url, key);
        info!(key = %key, bytes = total, "Uploading archive");

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.token.bearer())
            .header("Content-Type", "application/zip")
            .header("Content-Length", total)
            .header(
                "x-amz-meta-description",
                urlencoding::encode(&metadata.description).into_owned(),
            )
            .header("x-amz-meta-reference", metadata.reference.to_string())
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| TransportError::request("Upload", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                operation: "Upload".to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string());

        info!(key = %key, "Upload complete");
        Ok(UploadReceipt {
            key: key.to_string(),
            bytes: total,
            etag,
        })
    }
}
