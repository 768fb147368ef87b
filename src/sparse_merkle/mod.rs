//! Implements a fixed-depth sparse merkle tree over an in-memory data store which maps node
//! digests to node contents.
//!
//! Empty subtrees hash to the all-zero digest at every height, so they never need to be stored
//! and never need to appear in a proof.

/// Defines traits and types for storing nodes by digest.
pub mod db;
/// Defines errors that might arise when mutating the tree or verifying proofs.
pub mod error;
/// Defines proofs on the tree.
pub mod proof;
/// Defines the sparse merkle tree itself.
pub mod tree;
/// Fixed-width words used for indices and bitmaps.
pub mod utils;
/// Stateless proof verification.
pub mod verifier;

/// The length of a digest in bytes
pub const HASH_LEN: usize = 32;

/// A digest, encoded as 32 big-endian bytes
pub type Digest = [u8; HASH_LEN];

/// The digest of an empty subtree, at any height
pub const ZERO_DIGEST: Digest = [0u8; HASH_LEN];

/// The discriminant appended to every leaf before hashing. Leaves hash three words while inner
/// nodes hash two, and the tag is never zero.
pub const LEAF_TAG: u8 = 1;
