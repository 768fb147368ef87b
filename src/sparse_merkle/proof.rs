use super::error::ProofError;
use super::tree::SparseMerkleHash;
use super::utils::Word;
use super::verifier::{compute_root, verify_membership};
use super::{Digest, HASH_LEN};
use crate::maybestd::vec::Vec;
use crate::Sha2Hasher;

/// A proof that a leaf position of a sparse merkle tree holds a particular digest.
///
/// A proof of the zero leaf shows that the position is empty.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseProof {
    /// The leaf digest at the proven position
    pub leaf: Digest,
    /// The position of the leaf
    pub index: Word,
    /// Bit `i` is set if the sibling `i` levels above the leaf is nonempty
    pub enables: Word,
    /// The nonempty siblings, nearest the leaf first
    pub siblings: Vec<Digest>,
}

impl SparseProof {
    /// Returns true if the proof shows that the position is empty
    pub fn is_of_absence(&self) -> bool {
        self.leaf == super::ZERO_DIGEST
    }

    /// Returns true if the proof shows that the position holds a leaf
    pub fn is_of_presence(&self) -> bool {
        !self.is_of_absence()
    }

    /// Reconstructs the root of a tree of the given depth implied by this proof
    pub fn compute_root_with_hasher<H: SparseMerkleHash>(
        &self,
        hasher: &H,
        depth: usize,
    ) -> Result<Digest, ProofError> {
        compute_root(
            hasher,
            depth,
            &self.leaf,
            &self.index,
            &self.enables,
            &self.siblings,
        )
    }

    /// Verify the proof against a root, using the given hasher
    pub fn verify_with_hasher<H: SparseMerkleHash>(
        &self,
        hasher: &H,
        root: &Digest,
        depth: usize,
    ) -> Result<(), ProofError> {
        verify_membership(
            hasher,
            depth,
            root,
            &self.leaf,
            &self.index,
            &self.enables,
            &self.siblings,
        )
    }

    /// Verify the proof against a root, using the default sha256 hasher
    pub fn verify(&self, root: &Digest, depth: usize) -> Result<(), ProofError> {
        self.verify_with_hasher(&Sha2Hasher, root, depth)
    }

    /// Encodes the proof as `leaf || index || enables || siblings`, each a 32-byte big-endian
    /// word. This is the argument layout expected by standalone verifiers.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((3 + self.siblings.len()) * HASH_LEN);
        out.extend_from_slice(&self.leaf);
        out.extend_from_slice(self.index.as_bytes());
        out.extend_from_slice(self.enables.as_bytes());
        for sibling in self.siblings.iter() {
            out.extend_from_slice(sibling);
        }
        out
    }

    /// Decodes a proof from the layout produced by [`SparseProof::to_bytes`]. Only the framing is
    /// checked here; the sibling count is checked against `enables` during verification.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        if bytes.len() < 3 * HASH_LEN || bytes.len() % HASH_LEN != 0 {
            return Err(ProofError::MalformedEncoding { len: bytes.len() });
        }
        let mut words = bytes.chunks_exact(HASH_LEN).map(|chunk| {
            let mut word = [0u8; HASH_LEN];
            word.copy_from_slice(chunk);
            word
        });
        let mut next = || {
            words
                .next()
                .ok_or(ProofError::MalformedEncoding { len: bytes.len() })
        };
        let leaf = next()?;
        let index = Word(next()?);
        let enables = Word(next()?);
        Ok(Self {
            leaf,
            index,
            enables,
            siblings: words.collect(),
        })
    }
}

/// The result of writing a leaf: a proof of the leaf that was replaced, and the new leaf.
///
/// A write only changes the nodes on the path above the leaf, so the siblings of the old proof
/// also prove the new leaf against the new root.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateProof {
    /// The root before the write
    pub old_root: Digest,
    /// The root after the write
    pub new_root: Digest,
    /// A proof of the replaced leaf against `old_root`. Its leaf is zero if the position was empty.
    pub old: SparseProof,
    /// The leaf written to the position. Zero if the write emptied it.
    pub new_leaf: Digest,
}

impl UpdateProof {
    /// Returns a proof of the new leaf against `new_root`
    pub fn new_proof(&self) -> SparseProof {
        SparseProof {
            leaf: self.new_leaf,
            ..self.old.clone()
        }
    }

    /// Checks that the old proof matches `old_root` and the new proof matches `new_root`
    pub fn verify_with_hasher<H: SparseMerkleHash>(
        &self,
        hasher: &H,
        depth: usize,
    ) -> Result<(), ProofError> {
        self.old.verify_with_hasher(hasher, &self.old_root, depth)?;
        self.new_proof()
            .verify_with_hasher(hasher, &self.new_root, depth)
    }
}
