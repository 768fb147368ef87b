use super::Digest;
use super::utils::Word;

/// An error that occurred while trying to check a claimed proof against a root.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum ProofError {
    /// The claimed depth is wider than an index
    #[error("depth {depth} exceeds the maximum of 256")]
    DepthTooLarge {
        /// The depth that was requested
        depth: usize,
    },
    /// The index does not fit in a tree of the claimed depth
    #[error("index {index} does not fit in a tree of depth {depth}")]
    IndexOutOfRange {
        /// The index that was provided
        index: Word,
        /// The depth of the tree
        depth: usize,
    },
    /// The enables bitmap marks a level at or above the claimed depth
    #[error("enables bitmap {enables} has bits set at or above depth {depth}")]
    EnablesOutOfRange {
        /// The bitmap that was provided
        enables: Word,
        /// The depth of the tree
        depth: usize,
    },
    /// The proof is malformed - the number of siblings does not match the enables bitmap
    #[error("expected {expected} siblings but the proof carries {actual}")]
    SiblingCountMismatch {
        /// The number of bits set in the enables bitmap
        expected: usize,
        /// The number of siblings provided
        actual: usize,
    },
    /// The proof is for a different position than the one the key hashes to
    #[error("the proof is for index {actual} but the key maps to {expected}")]
    IndexMismatch {
        /// The index the key hashes to
        expected: Word,
        /// The index carried by the proof
        actual: Word,
    },
    /// The proof carries a different leaf than the claimed entry hashes to
    #[error("the proof does not carry the claimed leaf")]
    LeafMismatch,
    /// The claimed proof does not verify against the provided root
    #[error("the proof does not reconstruct the expected root")]
    InvalidRoot,
    /// A serialized proof is not a whole number of words, or is too short to hold the header
    #[error("a serialized proof must hold at least three 32-byte words, got {len} bytes")]
    MalformedEncoding {
        /// The length of the rejected buffer
        len: usize,
    },
}

/// An error that occurred while reading or mutating a tree.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum TreeError {
    /// Trees must have a depth between 1 and 256 inclusive
    #[error("a tree must have a depth between 1 and 256, got {0}")]
    InvalidDepth(usize),
    /// The index does not fit in the tree
    #[error("index {index} does not fit in a tree of depth {depth}")]
    IndexOutOfRange {
        /// The index that was provided
        index: Word,
        /// The depth of the tree
        depth: usize,
    },
    /// An insert targeted an index that already holds a leaf
    #[error("index {0} already holds a leaf")]
    LeafExists(Word),
    /// An update or removal targeted an index that holds no leaf
    #[error("index {0} holds no leaf")]
    LeafNotFound(Word),
    /// The zero digest is reserved for empty leaves and cannot be stored as a value
    #[error("the zero digest cannot be stored as a value")]
    ZeroValue,
    /// A nonzero digest on a root-to-leaf path is missing from the store. The store is corrupt.
    #[error("node {} is referenced but missing from the store", as_word(.0))]
    MissingNode(Digest),
    /// A stored node has the wrong shape for its position in the tree. The store is corrupt.
    #[error("node {} has the wrong shape for its position", as_word(.0))]
    MalformedNode(Digest),
    /// A stored leaf holds a key which does not hash to the index it was found at. The store is
    /// corrupt.
    #[error("leaf {} does not belong to the requested key", as_word(.0))]
    KeyMismatch(Digest),
    /// A proof produced or consumed by the tree was rejected
    #[error(transparent)]
    Proof(#[from] ProofError),
}

fn as_word(digest: &Digest) -> Word {
    Word(*digest)
}

impl TreeError {
    /// Returns true if the error indicates store corruption rather than bad input from the caller
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            TreeError::MissingNode(_) | TreeError::MalformedNode(_) | TreeError::KeyMismatch(_)
        )
    }
}
