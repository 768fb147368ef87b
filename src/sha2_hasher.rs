use sha2::{Digest as _, Sha256};

use crate::sparse_merkle::tree::SparseMerkleHash;
use crate::sparse_merkle::Digest;

fn hash(chunks: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// A sha256 hasher. Inner nodes hash `left || right`, leaves hash `key || value || tag` and keys
/// are hashed on their own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sha2Hasher;

impl Sha2Hasher {
    /// Create a new instance of the hasher
    pub fn new() -> Self {
        Sha2Hasher
    }

    /// Hashes arbitrary bytes into a digest, for deriving keys and values from raw data
    pub fn hash_bytes(bytes: &[u8]) -> Digest {
        hash(&[bytes])
    }
}

impl SparseMerkleHash for Sha2Hasher {
    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        hash(&[left.as_slice(), right.as_slice()])
    }

    fn hash_triple(&self, a: &Digest, b: &Digest, c: &Digest) -> Digest {
        hash(&[a.as_slice(), b.as_slice(), c.as_slice()])
    }

    fn hash_key(&self, key: &Digest) -> Digest {
        hash(&[key.as_slice()])
    }
}
