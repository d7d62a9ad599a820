//! SHA-1 hex digest used as the script reference key.
//!
//! The store identifies cached scripts by the SHA-1 of their body, so
//! a locally computed digest can be checked with `SCRIPT EXISTS`
//! before anything is uploaded.

use sha1::{Digest, Sha1};

/// Compute a lowercase SHA-1 hex digest of the given bytes.
pub fn sha1_hex(data: &[u8]) -> String {
    let hash = Sha1::digest(data);
    format!("{hash:x}")
}

/// Digest of a script body, as the store would report it after upload.
pub fn script_digest(source: &str) -> String {
    sha1_hex(source.as_bytes())
}
