#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
//! This crate implements a sparse merkle tree: an authenticated map from fixed-width indices to
//! 32-byte values, summarized by a single root digest.
//!
//! The tree can prove to anyone holding only the root that an index holds a given value, or that
//! it holds nothing at all. Proofs are compressed: an `enables` bitmap marks which levels carry an
//! explicit sibling, and every other level is known to be an empty (all-zero) subtree.
//!
//! Two addressing modes are provided:
//! - [`IndexedMerkleTree`], where the caller chooses the index and the leaf is the value itself.
//! - [`SparseMerkleMap`], where the index is the hash of a key and the leaf commits to both the
//!   key and the value.
//!
//! Proof verification needs no access to the tree. See [`sparse_merkle::verifier`] for the free
//! functions, which are suitable for embedding in restricted execution environments.

#[cfg(not(feature = "std"))]
extern crate alloc;

mod maybestd {
    #[cfg(not(feature = "std"))]
    pub use alloc::vec;
    pub use core::fmt;
    #[cfg(feature = "std")]
    pub use std::vec;

    pub mod hash_or_btree_map {
        #[cfg(not(feature = "std"))]
        pub use alloc::collections::btree_map::{BTreeMap as Map, Entry};
        #[cfg(feature = "std")]
        pub use std::collections::hash_map::{Entry, HashMap as Map};
    }
}

/// An index-addressed sparse merkle tree.
pub mod indexed;
/// A key-addressed sparse merkle map.
pub mod keyed;
mod sha2_hasher;
/// The sparse merkle tree engine: store, proofs, mutation and verification.
pub mod sparse_merkle;

pub use indexed::{IndexedLookup, IndexedMerkleTree};
pub use keyed::{KeyedLookup, SparseMerkleMap};
pub use sha2_hasher::Sha2Hasher;
pub use sparse_merkle::{
    db::{MemDb, Node, PreimageDb},
    error::{ProofError, TreeError},
    proof::{SparseProof, UpdateProof},
    tree::{SparseMerkleHash, SparseMerkleTree},
    utils::{Word, MAX_DEPTH},
    Digest, HASH_LEN, LEAF_TAG, ZERO_DIGEST,
};
