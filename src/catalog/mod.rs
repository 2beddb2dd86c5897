//! Item catalog and global fallback anchor table
//!
//! One store is shared by every character. It is passed around as a
//! [`CatalogHandle`] and mutated by a single writer at a time.

pub mod defaults;
pub mod item;
pub mod store;

pub use defaults::{default_transform, stock_items, STOCK_BASE_ITEMS};
pub use item::{ItemDefinition, MaterialSlot, Scale, TransformRecord};
pub use store::{CatalogHandle, ChangeSet, ItemOrigin, ItemStore};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Malformed catalog document: {reason}")]
    MalformedDocument { reason: String },

    #[error("Catalog entry '{id}' is not a JSON object")]
    NotAnObject { id: String },

    #[error("Invalid catalog entry '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Unknown catalog item '{id}'")]
    UnknownItem { id: String },

    #[error("Catalog I/O failed: {reason}")]
    Io { reason: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io {
            reason: err.to_string(),
        }
    }
}
