//! Content fingerprints for view definition sources.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Lowercase hexadecimal SHA-256 digest of a definition source's raw bytes.
///
/// The digest is taken before parsing, so any byte change, including whitespace,
/// produces a different fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of `raw`.
    pub fn of(raw: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raw);

        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a digest read back from the store.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the fingerprint of a definition source's raw bytes.
pub fn fingerprint(raw: &[u8]) -> Fingerprint {
    Fingerprint::of(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_fingerprint() {
        let raw = br#"{"views":{"all":{"map":"function(doc) { emit(null, doc); }"}}}"#;

        assert_eq!(fingerprint(raw), fingerprint(raw));
        assert_eq!(fingerprint(raw).as_str().len(), 64);
    }

    #[test]
    fn whitespace_changes_flip_the_fingerprint() {
        let compact = br#"{"views":{}}"#;
        let spaced = br#"{ "views": {} }"#;

        assert_ne!(fingerprint(compact), fingerprint(spaced));
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            fingerprint(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
