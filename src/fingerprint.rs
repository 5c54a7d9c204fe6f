//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 digest of a document's bytes. It is the gate
//! that decides whether a document needs re-extraction, so it runs on every
//! discovered document on every scan. Two documents with identical bytes
//! always share a fingerprint; a digest collision would be treated as
//! "unchanged".

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::DocumentError;
use crate::models::Fingerprint;

pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_hex(format!("{:x}", hasher.finalize()))
}

/// Reads a file and fingerprints it, returning the bytes so callers can
/// extract from exactly the content that was hashed.
pub fn fingerprint_file(path: &Path) -> Result<(Fingerprint, Vec<u8>), DocumentError> {
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((fingerprint(&bytes), bytes))
}
