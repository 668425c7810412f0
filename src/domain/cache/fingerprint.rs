//! Content fingerprints used as HTTP validators

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Strong validator derived from payload bytes
///
/// Stored in wire form: the hex SHA-256 digest wrapped in double quotes,
/// ready to be used as an `ETag` header value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a serialized payload
    pub fn compute(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        Self(format!("\"{}\"", hex::encode(digest)))
    }

    /// Returns the quoted token (the `ETag` header value)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks a caller-supplied validator (an `If-None-Match` value)
    ///
    /// The validator may list several tags separated by commas; any element
    /// exactly equal to this fingerprint is a match. Empty validators never match.
    pub fn matches(&self, validator: &str) -> bool {
        validator
            .split(',')
            .map(str::trim)
            .any(|candidate| !candidate.is_empty() && candidate == self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
