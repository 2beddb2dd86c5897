//! Asset pipeline for cosmetic parts
//!
//! Fetches mesh containers through a pluggable transport, decodes them on the
//! background decode pool and hands the result to the character controller.
//! Load failures never escape the loader: they degrade to an empty part.

pub mod animation;
pub mod cache;
pub mod loader;
pub mod mesh;
pub mod reader;
pub mod transport;

pub use animation::{AnimationClip, Bone, Skeleton};
pub use cache::{CacheStats, PayloadCache};
pub use loader::{AssetLoader, LoadedAsset};
pub use mesh::{decode, MaterialRecord, MeshAsset, MeshRecord, VertexLayout};
pub use transport::{AssetTransport, BlobRegistry, FileTransport, HttpTransport, MemoryTransport};

use thiserror::Error;

/// Structural violations in a mesh container
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("Bad mesh magic: expected {expected:#010x}, found {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("Read out of range at offset {offset}: need {wanted} bytes, have {remaining}")]
    OutOfRange {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    #[error("Invalid index width {width} (expected 2 or 4)")]
    InvalidIndexWidth { width: u8 },

    #[error("Invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Mesh decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetch for {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Animation load failed: {reason}")]
    Animation { reason: String },

    #[error("Decode pool unavailable: {reason}")]
    WorkerPool { reason: String },
}

pub type AssetResult<T> = Result<T, AssetError>;

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        AssetError::Fetch {
            url: String::new(),
            reason: err.to_string(),
        }
    }
}
