//! Content fingerprinting for audio deduplication.
//!
//! A fingerprint is the SHA3-256 digest of the raw submitted bytes. It is the
//! unique cache key for analysis results: byte-identical resubmissions hash to
//! the same fingerprint across process restarts and hit the existing record
//! instead of being re-transcribed.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Stable content address for a submitted audio artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFingerprint {
    /// SHA3-256 digest of the raw content
    pub digest: [u8; 32],
}

impl ContentFingerprint {
    /// Compute the fingerprint of raw audio bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&result);

        Self { digest }
    }

    /// Hex-encoded form used as the storage key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
