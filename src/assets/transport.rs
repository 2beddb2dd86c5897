//! Byte transports for asset fetches
//!
//! The loader only needs "give me the bytes behind this resolved reference".
//! Locally supplied files are registered in a [`BlobRegistry`] and addressed
//! through minted `blob:` references that bypass the network.

use super::{AssetError, AssetResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scheme prefix of minted local references
pub const BLOB_SCHEME: &str = "blob:";

/// Async byte fetch for a resolved reference
#[async_trait]
pub trait AssetTransport: Send + Sync {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// HTTP(S) transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
        debug!("🌐 GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| AssetError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| AssetError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Filesystem transport rooted at a directory; accepts plain paths and `file://` URLs
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        if let Ok(parsed) = url::Url::parse(url) {
            if parsed.scheme() == "file" {
                if let Ok(path) = parsed.to_file_path() {
                    return path;
                }
            }
        }
        self.root.join(url.trim_start_matches('/'))
    }
}

#[async_trait]
impl AssetTransport for FileTransport {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
        let path = self.path_for(url);
        debug!("📁 Reading {}", path.display());
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| AssetError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory transport, used for tests and for bundled assets
#[derive(Default)]
pub struct MemoryTransport {
    files: RwLock<HashMap<String, Bytes>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, data: impl Into<Bytes>) {
        self.write_files().insert(url.into(), data.into());
    }

    pub fn remove(&self, url: &str) {
        self.write_files().remove(url);
    }

    /// Entries are whole payloads, so a panic elsewhere cannot leave one half-written
    fn write_files(&self) -> RwLockWriteGuard<'_, HashMap<String, Bytes>> {
        self.files.write().unwrap_or_else(|poisoned| {
            warn!("Memory transport lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl AssetTransport for MemoryTransport {
    async fn fetch(&self, url: &str) -> AssetResult<Bytes> {
        let files = self.files.read().unwrap_or_else(|poisoned| {
            warn!("Memory transport lock poisoned, recovering");
            poisoned.into_inner()
        });
        files.get(url).cloned().ok_or_else(|| AssetError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Temporary loadable references for locally supplied files
#[derive(Default)]
pub struct BlobRegistry {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return a `blob:` reference for them
    pub fn mint(&self, file_name: &str, data: impl Into<Bytes>) -> String {
        let reference = format!("{}{}/{}", BLOB_SCHEME, Uuid::new_v4(), file_name);
        match self.blobs.write() {
            Ok(mut blobs) => {
                blobs.insert(reference.clone(), data.into());
            }
            Err(e) => warn!("Blob registry poisoned, {} will not resolve: {}", reference, e),
        }
        reference
    }

    pub fn get(&self, reference: &str) -> Option<Bytes> {
        self.blobs.read().ok()?.get(reference).cloned()
    }

    /// Drop a minted reference
    pub fn revoke(&self, reference: &str) -> bool {
        self.blobs
            .write()
            .map(|mut blobs| blobs.remove(reference).is_some())
            .unwrap_or(false)
    }

    pub fn is_blob(reference: &str) -> bool {
        reference.starts_with(BLOB_SCHEME)
    }
}
