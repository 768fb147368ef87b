use super::db::{Node, PreimageDb};
use super::error::TreeError;
use super::proof::{SparseProof, UpdateProof};
use super::utils::{Word, MAX_DEPTH};
use super::verifier::verify_membership;
use super::{Digest, HASH_LEN, LEAF_TAG, ZERO_DIGEST};
use crate::maybestd::vec::Vec;

/// The leaf tag, widened to a full word
const LEAF_TAG_WORD: Digest = {
    let mut out = [0u8; HASH_LEN];
    out[HASH_LEN - 1] = LEAF_TAG;
    out
};

/// A trait for hashing nodes of a sparse merkle tree.
///
/// Implementors supply the raw compression functions. The provided methods add the rules the
/// tree depends on: two empty children always hash to [`ZERO_DIGEST`], and leaves hash three
/// words where inner nodes hash two. Whether differing input lengths are enough to keep leaf and
/// inner digests apart is a property of the underlying hash function.
pub trait SparseMerkleHash {
    /// Compresses two words into one
    fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest;
    /// Compresses three words into one
    fn hash_triple(&self, a: &Digest, b: &Digest, c: &Digest) -> Digest;
    /// Hashes a key of a [`SparseMerkleMap`](crate::SparseMerkleMap) into the index of its leaf
    fn hash_key(&self, key: &Digest) -> Digest;

    /// Hashes two children into their parent. Two empty children make an empty parent.
    fn hash_nodes(&self, left: &Digest, right: &Digest) -> Digest {
        if left == &ZERO_DIGEST && right == &ZERO_DIGEST {
            return ZERO_DIGEST;
        }
        self.hash_pair(left, right)
    }

    /// Hashes a key-value pair into a leaf
    fn hash_leaf(&self, key: &Digest, value: &Digest) -> Digest {
        self.hash_triple(key, value, &LEAF_TAG_WORD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Insert,
    Update,
    Upsert,
    Remove,
}

/// Everything learned by walking from the root to one leaf
struct PathWalk {
    /// The digest found at the bottom of the path
    leaf: Digest,
    /// The sibling at every level, including empty ones. Index 0 is the level nearest the leaf.
    siblings: Vec<Digest>,
    /// The nonzero inner nodes on the path, root first
    stale: Vec<Digest>,
}

impl PathWalk {
    fn into_proof(self, index: Word) -> SparseProof {
        let mut enables = Word::ZERO;
        let mut siblings = Vec::new();
        for (level, sibling) in self.siblings.into_iter().enumerate() {
            if sibling != ZERO_DIGEST {
                enables.set_bit(level);
                siblings.push(sibling);
            }
        }
        SparseProof {
            leaf: self.leaf,
            index,
            enables,
            siblings,
        }
    }
}

/// A fixed-depth sparse merkle tree over a content-addressed node store.
///
/// Each of the `2^depth` leaf positions holds a digest, with [`ZERO_DIGEST`] marking an empty
/// position. Only nonzero nodes are stored; everything else is implied by the zero rule of
/// [`SparseMerkleHash::hash_nodes`]. Mutations rewrite a single root-to-leaf path and discard
/// the nodes they replace, so no earlier root can be queried after a write.
#[derive(Debug, Clone)]
pub struct SparseMerkleTree<Db, H> {
    db: Db,
    root: Digest,
    depth: usize,
    hasher: H,
}

impl<Db, H> SparseMerkleTree<Db, H>
where
    Db: PreimageDb,
    H: SparseMerkleHash + Default,
{
    /// Constructs an empty tree of the given depth with a default hasher
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        Self::with_hasher(depth, Default::default())
    }
}

impl<Db, H> SparseMerkleTree<Db, H>
where
    Db: PreimageDb,
    H: SparseMerkleHash,
{
    /// Constructs an empty tree of the given depth with the given hasher. The depth must be
    /// between 1 and [`MAX_DEPTH`] inclusive.
    pub fn with_hasher(depth: usize, hasher: H) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth(depth));
        }
        Ok(Self {
            db: Default::default(),
            root: ZERO_DIGEST,
            depth,
            hasher,
        })
    }

    /// Constructs an empty tree spanning the whole index space
    pub(crate) fn full_width(hasher: H) -> Self {
        Self {
            db: Default::default(),
            root: ZERO_DIGEST,
            depth: MAX_DEPTH,
            hasher,
        }
    }

    /// Returns the root of the tree. The empty tree has the zero root.
    pub fn root(&self) -> Digest {
        self.root
    }

    /// Returns the depth of the tree
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the hasher used by the tree
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the node with the given digest, if it is stored
    pub fn get_node(&self, digest: &Digest) -> Option<&Node> {
        self.db.get(digest)
    }

    /// Returns the leaf digest at the given index, which is zero if the position is empty
    pub fn leaf_at(&self, index: &Word) -> Result<Digest, TreeError> {
        Ok(self.walk(index)?.leaf)
    }

    /// Creates a proof of the leaf currently at `index`. If the position is empty, the proof
    /// carries the zero leaf and proves non-membership.
    ///
    /// Example: consider a tree of depth 3 which holds a single leaf `X` at index 1
    /// ```ascii
    ///              root
    ///            /      \
    ///          A          0
    ///        /   \
    ///      B       0
    ///     / \
    ///    0   X
    /// ```
    /// A proof for index 0 has leaf `0`, enables `0b001` and siblings `[X]`: only the level
    /// nearest the leaf has a nonempty sibling.
    pub fn prove(&self, index: &Word) -> Result<SparseProof, TreeError> {
        let proof = self.walk(index)?.into_proof(*index);
        tracing::trace!(
            %index,
            enables = %proof.enables,
            siblings = proof.siblings.len(),
            "built proof"
        );
        Ok(proof)
    }

    /// Checks a proof against the current root
    pub fn verify(&self, proof: &SparseProof) -> Result<(), TreeError> {
        verify_membership(
            &self.hasher,
            self.depth,
            &self.root,
            &proof.leaf,
            &proof.index,
            &proof.enables,
            &proof.siblings,
        )?;
        Ok(())
    }

    /// Writes a leaf to an empty position
    pub fn insert(&mut self, index: &Word, leaf: Digest) -> Result<UpdateProof, TreeError> {
        Self::check_leaf(&leaf)?;
        self.write(index, leaf, None, Operation::Insert)
    }

    /// Overwrites the leaf at an occupied position
    pub fn update(&mut self, index: &Word, leaf: Digest) -> Result<UpdateProof, TreeError> {
        Self::check_leaf(&leaf)?;
        self.write(index, leaf, None, Operation::Update)
    }

    /// Writes a leaf regardless of whether the position is occupied
    pub fn upsert(&mut self, index: &Word, leaf: Digest) -> Result<UpdateProof, TreeError> {
        Self::check_leaf(&leaf)?;
        self.write(index, leaf, None, Operation::Upsert)
    }

    /// Empties an occupied position
    pub fn remove(&mut self, index: &Word) -> Result<UpdateProof, TreeError> {
        self.write(index, ZERO_DIGEST, None, Operation::Remove)
    }

    fn check_leaf(leaf: &Digest) -> Result<(), TreeError> {
        if leaf == &ZERO_DIGEST {
            return Err(TreeError::ZeroValue);
        }
        Ok(())
    }

    fn check_index(&self, index: &Word) -> Result<(), TreeError> {
        if !index.fits_in(self.depth) {
            return Err(TreeError::IndexOutOfRange {
                index: *index,
                depth: self.depth,
            });
        }
        Ok(())
    }

    /// Returns the children of the inner node with the given digest. The zero digest stands for
    /// an empty inner node with two empty children.
    fn children(&self, digest: &Digest) -> Result<(Digest, Digest), TreeError> {
        if digest == &ZERO_DIGEST {
            return Ok((ZERO_DIGEST, ZERO_DIGEST));
        }
        match self.db.get(digest) {
            Some(Node::Inner(left, right)) => Ok((*left, *right)),
            Some(Node::Leaf { .. }) => Err(TreeError::MalformedNode(*digest)),
            None => Err(TreeError::MissingNode(*digest)),
        }
    }

    /// Walks from the root to the leaf at `index`, consuming index bits from the most significant
    /// end.
    fn walk(&self, index: &Word) -> Result<PathWalk, TreeError> {
        self.check_index(index)?;
        let mut siblings = Vec::with_capacity(self.depth);
        siblings.resize(self.depth, ZERO_DIGEST);
        let mut stale = Vec::new();

        let mut current = self.root;
        for level in (0..self.depth).rev() {
            let (left, right) = self.children(&current)?;
            if current != ZERO_DIGEST {
                stale.push(current);
            }
            let (next, sibling) = if index.bit(level) {
                (right, left)
            } else {
                (left, right)
            };
            siblings[level] = sibling;
            current = next;
        }

        Ok(PathWalk {
            leaf: current,
            siblings,
            stale,
        })
    }

    /// Hashes two children into a parent and stores the parent, unless it is empty
    fn store_inner(&mut self, left: Digest, right: Digest) -> Digest {
        let digest = self.hasher.hash_nodes(&left, &right);
        if digest != ZERO_DIGEST {
            self.db.put(digest, Node::Inner(left, right));
        }
        digest
    }

    /// Replaces the leaf at `index` and rebuilds the path above it.
    ///
    /// All reads and checks happen before the first write, so an error leaves the tree untouched.
    pub(crate) fn write(
        &mut self,
        index: &Word,
        leaf: Digest,
        record: Option<Node>,
        op: Operation,
    ) -> Result<UpdateProof, TreeError> {
        let walk = self.walk(index)?;
        let exists = walk.leaf != ZERO_DIGEST;
        match op {
            Operation::Insert if exists => return Err(TreeError::LeafExists(*index)),
            Operation::Update | Operation::Remove if !exists => {
                return Err(TreeError::LeafNotFound(*index))
            }
            _ => {}
        }

        let old_root = self.root;
        for digest in walk.stale.iter() {
            self.db.remove(digest);
        }
        // Only key-addressed leaves are stored; an indexed leaf is just a value.
        let stored_leaf = matches!(self.db.get(&walk.leaf), Some(Node::Leaf { .. }));
        if exists && stored_leaf {
            self.db.remove(&walk.leaf);
        }
        if let Some(node) = record {
            self.db.put(leaf, node);
        }

        let mut current = leaf;
        for (level, sibling) in walk.siblings.iter().enumerate() {
            current = if index.bit(level) {
                self.store_inner(*sibling, current)
            } else {
                self.store_inner(current, *sibling)
            };
        }
        self.root = current;

        tracing::debug!(
            ?op,
            %index,
            old_root = %Word(old_root),
            new_root = %Word(current),
            "committed leaf write"
        );

        Ok(UpdateProof {
            old_root,
            new_root: current,
            old: walk.into_proof(*index),
            new_leaf: leaf,
        })
    }
}
