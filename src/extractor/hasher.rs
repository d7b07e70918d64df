use sha2::{Digest as _, Sha256};
use std::fmt;

/// Fixed-size SHA-256 digest of some content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hashes remote and local content the same way so the two can be compared.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn hash(bytes: impl AsRef<[u8]>) -> ContentDigest {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        ContentDigest(hasher.finalize().into())
    }
}
