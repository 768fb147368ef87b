use super::Digest;
use crate::maybestd::hash_or_btree_map::{Entry, Map};

/// The contents of a node, addressed by its digest
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// An internal node, identified by `hash_nodes(left, right)`
    Inner(Digest, Digest),
    /// A key-addressed leaf, identified by `hash_leaf(key, value)`
    Leaf {
        /// The key whose hash selects the leaf's position
        key: Digest,
        /// The value committed to by the leaf
        value: Digest,
    },
}

/// A stored node, together with the number of positions in the tree which currently refer to it
#[derive(Debug, Clone)]
struct StoredNode {
    node: Node,
    refs: usize,
}

/// An in-memory node store.
///
/// The same subtree can occur at several positions of a tree, so entries are counted: a node is
/// only discarded once every position that referred to it has been removed.
#[derive(Default, Debug, Clone)]
pub struct MemDb(Map<Digest, StoredNode>);

impl MemDb {
    /// Returns the number of distinct nodes in the store
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the store holds no nodes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PreimageReader for MemDb {
    fn get(&self, image: &Digest) -> Option<&Node> {
        self.0.get(image).map(|entry| &entry.node)
    }
}

impl PreimageWriter for MemDb {
    fn put(&mut self, image: Digest, preimage: Node) {
        match self.0.entry(image) {
            Entry::Occupied(entry) => entry.into_mut().refs += 1,
            Entry::Vacant(entry) => {
                entry.insert(StoredNode {
                    node: preimage,
                    refs: 1,
                });
            }
        }
    }

    fn remove(&mut self, image: &Digest) {
        if let Entry::Occupied(mut entry) = self.0.entry(*image) {
            if entry.get().refs <= 1 {
                entry.remove();
            } else {
                entry.get_mut().refs -= 1;
            }
        }
    }
}

impl PreimageDb for MemDb {}

/// Read access to a store which maps node digests to node contents
pub trait PreimageReader {
    /// Returns the node with the given digest, if it is stored
    fn get(&self, image: &Digest) -> Option<&Node>;
}

/// Write access to a store which maps node digests to node contents
pub trait PreimageWriter {
    /// Records one more reference to `preimage` under `image`. Callers must ensure that
    /// `image` is the digest of `preimage`. The content of an existing entry never changes.
    fn put(&mut self, image: Digest, preimage: Node);
    /// Drops one reference to the node with the given digest. Removing an absent digest is a no-op.
    fn remove(&mut self, image: &Digest);
}

/// A store that can back a [`SparseMerkleTree`](super::tree::SparseMerkleTree)
pub trait PreimageDb: PreimageReader + PreimageWriter + Default {}
