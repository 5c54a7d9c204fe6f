//! Error types for the harvest pipeline.
//!
//! Errors are split by blast radius: [`ScanError`] aborts a scan before any
//! work begins, [`CacheError`] is recovered by the controller (corrupt cache
//! means full rescan, failed save means the previous cache stays in place),
//! and [`DocumentError`] only removes one document from the current run.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors: the scan cannot start.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("scan root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("invalid exclude glob '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Errors raised by the persistent cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("cache I/O failed on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raised by an [`Extractor`](crate::extract::Extractor) that cannot classify
/// a document.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExtractError(pub String);

/// Per-document failures. Never fatal to the scan.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", .0.display())]
    Decode(PathBuf),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("extractor panicked: {0}")]
    Panicked(String),
}
