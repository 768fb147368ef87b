use crate::sparse_merkle::{
    db::{MemDb, PreimageDb},
    error::TreeError,
    proof::{SparseProof, UpdateProof},
    tree::{SparseMerkleHash, SparseMerkleTree},
    utils::Word,
    Digest,
};
use crate::Sha2Hasher;

/// The result of looking up an index: whether it is occupied, its value, and a proof of either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedLookup {
    /// True if the index holds a value
    pub exists: bool,
    /// The value at the index, if any
    pub value: Option<Digest>,
    /// A proof of the value, or of the empty leaf
    pub proof: SparseProof,
}

/// A sparse merkle tree in which the caller picks the index of every value.
///
/// The leaf at an index is the value digest itself, so values must be nonzero: the zero digest
/// is what an empty index holds.
#[derive(Debug, Clone)]
pub struct IndexedMerkleTree<Db = MemDb, H = Sha2Hasher> {
    inner: SparseMerkleTree<Db, H>,
    len: usize,
}

impl IndexedMerkleTree<MemDb, Sha2Hasher> {
    /// Constructs an empty in-memory tree of the given depth, hashed with sha256
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        Self::with_hasher(depth, Sha2Hasher)
    }
}

impl<Db, H> IndexedMerkleTree<Db, H>
where
    Db: PreimageDb,
    H: SparseMerkleHash,
{
    /// Constructs an empty tree of the given depth with the given hasher
    pub fn with_hasher(depth: usize, hasher: H) -> Result<Self, TreeError> {
        Ok(Self {
            inner: SparseMerkleTree::with_hasher(depth, hasher)?,
            len: 0,
        })
    }

    /// Returns the root of the tree
    pub fn root(&self) -> Digest {
        self.inner.root()
    }

    /// Returns the depth of the tree
    pub fn depth(&self) -> usize {
        self.inner.depth()
    }

    /// Returns the number of occupied indices
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no index is occupied
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the underlying tree
    pub fn inner(&self) -> &SparseMerkleTree<Db, H> {
        &self.inner
    }

    /// Looks up an index, returning its value (if any) along with a proof
    pub fn get(&self, index: impl Into<Word>) -> Result<IndexedLookup, TreeError> {
        let proof = self.inner.prove(&index.into())?;
        let exists = proof.is_of_presence();
        Ok(IndexedLookup {
            exists,
            value: exists.then_some(proof.leaf),
            proof,
        })
    }

    /// Returns true if the index holds a value
    pub fn exists(&self, index: impl Into<Word>) -> Result<bool, TreeError> {
        Ok(self.inner.leaf_at(&index.into())? != crate::ZERO_DIGEST)
    }

    /// Stores a value at an empty index
    pub fn insert(
        &mut self,
        index: impl Into<Word>,
        value: Digest,
    ) -> Result<UpdateProof, TreeError> {
        let result = self.inner.insert(&index.into(), value)?;
        self.len += 1;
        Ok(result)
    }

    /// Replaces the value at an occupied index
    pub fn update(
        &mut self,
        index: impl Into<Word>,
        value: Digest,
    ) -> Result<UpdateProof, TreeError> {
        self.inner.update(&index.into(), value)
    }

    /// Stores a value at an index, whether or not it is occupied
    pub fn upsert(
        &mut self,
        index: impl Into<Word>,
        value: Digest,
    ) -> Result<UpdateProof, TreeError> {
        let result = self.inner.upsert(&index.into(), value)?;
        if result.old.is_of_absence() {
            self.len += 1;
        }
        Ok(result)
    }

    /// Empties an occupied index
    pub fn remove(&mut self, index: impl Into<Word>) -> Result<UpdateProof, TreeError> {
        let result = self.inner.remove(&index.into())?;
        self.len -= 1;
        Ok(result)
    }

    /// Checks a proof against the current root
    pub fn verify(&self, proof: &SparseProof) -> Result<(), TreeError> {
        self.inner.verify(proof)
    }
}
