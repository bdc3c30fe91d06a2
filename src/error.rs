//! Error types for decoding, encoding, exporting and persisting editor states

use thiserror::Error;

use crate::export::ExportFormat;
use crate::node::NodeKind;

/// Why a JSON document (or a hand-built tree) was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Malformed document at {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Unsupported version {found} at {path} (supported up to {supported})")]
    UnsupportedVersion {
        path: String,
        found: u64,
        supported: u32,
    },
}

impl DocumentError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DocumentError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
#[error("Encoding failed: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Converter does not handle {0} nodes")]
    UnsupportedNode(NodeKind),

    #[error("No converter registered for {}", .0.title())]
    Unregistered(ExportFormat),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Failed to load stored state: {0}")]
    Store(#[from] StoreError),

    #[error("Stored state rejected: {0}")]
    Decode(#[from] DocumentError),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Failed to save state: {0}")]
    Store(#[from] StoreError),
}
