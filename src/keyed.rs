use crate::sparse_merkle::{
    db::{MemDb, Node, PreimageDb},
    error::{ProofError, TreeError},
    proof::{SparseProof, UpdateProof},
    tree::{Operation, SparseMerkleHash, SparseMerkleTree},
    utils::{Word, MAX_DEPTH},
    Digest, ZERO_DIGEST,
};
use crate::Sha2Hasher;

/// The result of looking up a key: whether it is present, its value, and a proof of either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedLookup {
    /// True if the key is present
    pub exists: bool,
    /// The key that was looked up
    pub key: Digest,
    /// The value stored under the key, if any
    pub value: Option<Digest>,
    /// A proof of the key's leaf, or of the empty leaf at its position
    pub proof: SparseProof,
}

/// A sparse merkle tree of depth 256 keyed by arbitrary digests.
///
/// A key is stored at the index `hash_key(key)`, and its leaf is `hash_leaf(key, value)`. Because
/// the leaf commits to the key as well as the value, any value (including zero) can be stored.
#[derive(Debug, Clone)]
pub struct SparseMerkleMap<Db = MemDb, H = Sha2Hasher> {
    inner: SparseMerkleTree<Db, H>,
    len: usize,
}

impl SparseMerkleMap<MemDb, Sha2Hasher> {
    /// Constructs an empty in-memory map, hashed with sha256
    pub fn new() -> Self {
        Self::with_hasher(Sha2Hasher)
    }
}

impl Default for SparseMerkleMap<MemDb, Sha2Hasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Db, H> SparseMerkleMap<Db, H>
where
    Db: PreimageDb,
    H: SparseMerkleHash,
{
    /// Constructs an empty map with the given hasher
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            inner: SparseMerkleTree::full_width(hasher),
            len: 0,
        }
    }

    /// Returns the root of the map
    pub fn root(&self) -> Digest {
        self.inner.root()
    }

    /// Returns the number of keys in the map
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no keys
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the underlying tree
    pub fn inner(&self) -> &SparseMerkleTree<Db, H> {
        &self.inner
    }

    /// Returns the index at which a key is stored
    pub fn index_of(&self, key: &Digest) -> Word {
        Word(self.inner.hasher().hash_key(key))
    }

    /// Returns the leaf digest committing to a key and value
    pub fn leaf_of(&self, key: &Digest, value: &Digest) -> Digest {
        self.inner.hasher().hash_leaf(key, value)
    }

    /// Looks up a key, returning its value (if any) along with a proof
    pub fn get(&self, key: &Digest) -> Result<KeyedLookup, TreeError> {
        let proof = self.inner.prove(&self.index_of(key))?;
        let value = self.decode_leaf(key, &proof.leaf)?;
        Ok(KeyedLookup {
            exists: value.is_some(),
            key: *key,
            value,
            proof,
        })
    }

    /// Returns true if the key is present
    pub fn contains_key(&self, key: &Digest) -> Result<bool, TreeError> {
        let leaf = self.inner.leaf_at(&self.index_of(key))?;
        Ok(self.decode_leaf(key, &leaf)?.is_some())
    }

    /// Reads the value out of the leaf found at a key's index. The leaf must either be empty or
    /// be a stored record for this exact key.
    fn decode_leaf(&self, key: &Digest, leaf: &Digest) -> Result<Option<Digest>, TreeError> {
        if leaf == &ZERO_DIGEST {
            return Ok(None);
        }
        match self.inner.get_node(leaf) {
            Some(Node::Leaf { key: stored, value }) if stored == key => Ok(Some(*value)),
            Some(Node::Leaf { .. }) => Err(TreeError::KeyMismatch(*leaf)),
            Some(Node::Inner(..)) => Err(TreeError::MalformedNode(*leaf)),
            None => Err(TreeError::MissingNode(*leaf)),
        }
    }

    fn write(
        &mut self,
        key: Digest,
        value: Option<Digest>,
        op: Operation,
    ) -> Result<UpdateProof, TreeError> {
        let index = self.index_of(&key);
        // Make sure whatever sits at the index belongs to this key before touching anything
        self.decode_leaf(&key, &self.inner.leaf_at(&index)?)?;
        let (leaf, record) = match value {
            Some(value) => (
                self.leaf_of(&key, &value),
                Some(Node::Leaf { key, value }),
            ),
            None => (ZERO_DIGEST, None),
        };
        let result = self.inner.write(&index, leaf, record, op)?;
        match (result.old.is_of_absence(), leaf == ZERO_DIGEST) {
            (true, false) => self.len += 1,
            (false, true) => self.len -= 1,
            _ => {}
        }
        Ok(result)
    }

    /// Stores a value under a key which is not yet present
    pub fn insert(&mut self, key: Digest, value: Digest) -> Result<UpdateProof, TreeError> {
        self.write(key, Some(value), Operation::Insert)
    }

    /// Replaces the value under a key which is present
    pub fn update(&mut self, key: Digest, value: Digest) -> Result<UpdateProof, TreeError> {
        self.write(key, Some(value), Operation::Update)
    }

    /// Stores a value under a key, whether or not it is present
    pub fn upsert(&mut self, key: Digest, value: Digest) -> Result<UpdateProof, TreeError> {
        self.write(key, Some(value), Operation::Upsert)
    }

    /// Removes a key which is present
    pub fn remove(&mut self, key: Digest) -> Result<UpdateProof, TreeError> {
        self.write(key, None, Operation::Remove)
    }

    /// Checks a proof against the current root
    pub fn verify(&self, proof: &SparseProof) -> Result<(), TreeError> {
        self.inner.verify(proof)
    }

    /// Checks that `proof` shows `key` mapped to `value` in the map with the given root
    pub fn verify_entry(
        hasher: &H,
        root: &Digest,
        key: &Digest,
        value: &Digest,
        proof: &SparseProof,
    ) -> Result<(), ProofError> {
        Self::check_index(hasher, key, proof)?;
        if proof.leaf != hasher.hash_leaf(key, value) {
            return Err(ProofError::LeafMismatch);
        }
        proof.verify_with_hasher(hasher, root, MAX_DEPTH)
    }

    /// Checks that `proof` shows `key` absent from the map with the given root
    pub fn verify_absence(
        hasher: &H,
        root: &Digest,
        key: &Digest,
        proof: &SparseProof,
    ) -> Result<(), ProofError> {
        Self::check_index(hasher, key, proof)?;
        if proof.is_of_presence() {
            return Err(ProofError::LeafMismatch);
        }
        proof.verify_with_hasher(hasher, root, MAX_DEPTH)
    }

    fn check_index(hasher: &H, key: &Digest, proof: &SparseProof) -> Result<(), ProofError> {
        let expected = Word(hasher.hash_key(key));
        if proof.index != expected {
            return Err(ProofError::IndexMismatch {
                expected,
                actual: proof.index,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maybestd::vec::Vec;

    type Map = SparseMerkleMap;

    fn digest(x: u64) -> Digest {
        Sha2Hasher::hash_bytes(&x.to_be_bytes())
    }

    #[test]
    fn test_insert_then_get_round_trips() {
        let mut map = Map::new();
        for i in 0..32u64 {
            let result = map.insert(digest(i), digest(i + 1000)).unwrap();
            assert!(result.old.is_of_absence());
            assert_eq!(result.new_root, map.root());
        }
        for i in 0..32u64 {
            let lookup = map.get(&digest(i)).unwrap();
            assert!(lookup.exists);
            assert_eq!(lookup.key, digest(i));
            assert_eq!(lookup.value, Some(digest(i + 1000)));
            map.verify(&lookup.proof).unwrap();
            Map::verify_entry(
                &Sha2Hasher,
                &map.root(),
                &digest(i),
                &digest(i + 1000),
                &lookup.proof,
            )
            .unwrap();
        }
        assert_eq!(map.len(), 32);
    }

    #[test]
    fn test_missing_key_proves_absence() {
        let mut map = Map::new();
        map.insert(digest(1), digest(2)).unwrap();
        let lookup = map.get(&digest(3)).unwrap();
        assert!(!lookup.exists);
        assert_eq!(lookup.value, None);
        assert!(!map.contains_key(&digest(3)).unwrap());
        assert!(map.contains_key(&digest(1)).unwrap());
        Map::verify_absence(&Sha2Hasher, &map.root(), &digest(3), &lookup.proof).unwrap();
        assert_eq!(
            Map::verify_absence(
                &Sha2Hasher,
                &map.root(),
                &digest(1),
                &map.get(&digest(1)).unwrap().proof
            ),
            Err(ProofError::LeafMismatch)
        );
    }

    #[test]
    fn test_zero_value_can_be_stored() {
        let mut map = Map::new();
        map.insert(digest(1), ZERO_DIGEST).unwrap();
        let lookup = map.get(&digest(1)).unwrap();
        assert!(lookup.exists);
        assert_eq!(lookup.value, Some(ZERO_DIGEST));
        assert_ne!(map.root(), ZERO_DIGEST);
    }

    #[test]
    fn test_update_and_remove() {
        let mut map = Map::new();
        map.insert(digest(1), digest(10)).unwrap();
        map.insert(digest(2), digest(20)).unwrap();
        let before = map.root();

        let result = map.update(digest(1), digest(11)).unwrap();
        assert_eq!(result.old_root, before);
        assert_eq!(result.old.leaf, map.leaf_of(&digest(1), &digest(10)));
        result.verify_with_hasher(&Sha2Hasher, MAX_DEPTH).unwrap();
        assert_eq!(map.get(&digest(1)).unwrap().value, Some(digest(11)));

        map.remove(digest(1)).unwrap();
        assert!(!map.contains_key(&digest(1)).unwrap());
        assert_eq!(map.len(), 1);

        assert_eq!(
            map.update(digest(1), digest(12)).unwrap_err(),
            TreeError::LeafNotFound(map.index_of(&digest(1)))
        );
        assert_eq!(
            map.insert(digest(2), digest(21)).unwrap_err(),
            TreeError::LeafExists(map.index_of(&digest(2)))
        );
    }

    #[test]
    fn test_upsert_tracks_len() {
        let mut map = Map::new();
        map.upsert(digest(1), digest(10)).unwrap();
        map.upsert(digest(1), digest(11)).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&digest(1)).unwrap().value, Some(digest(11)));
    }

    #[test]
    fn test_proof_for_wrong_key_or_value_is_rejected() {
        let mut map = Map::new();
        map.insert(digest(1), digest(10)).unwrap();
        map.insert(digest(2), digest(20)).unwrap();
        let root = map.root();
        let proof = map.get(&digest(1)).unwrap().proof;

        assert_eq!(
            Map::verify_entry(&Sha2Hasher, &root, &digest(1), &digest(11), &proof),
            Err(ProofError::LeafMismatch)
        );
        assert_eq!(
            Map::verify_entry(&Sha2Hasher, &root, &digest(2), &digest(10), &proof),
            Err(ProofError::IndexMismatch {
                expected: map.index_of(&digest(2)),
                actual: map.index_of(&digest(1)),
            })
        );
        assert_eq!(
            Map::verify_entry(&Sha2Hasher, &digest(99), &digest(1), &digest(10), &proof),
            Err(ProofError::InvalidRoot)
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let entries: Vec<(Digest, Digest)> =
            (0..20u64).map(|i| (digest(i), digest(i * 3))).collect();
        let mut forward = Map::new();
        for (key, value) in entries.iter() {
            forward.insert(*key, *value).unwrap();
        }
        let mut backward = Map::new();
        for (key, value) in entries.iter().rev() {
            backward.insert(*key, *value).unwrap();
        }
        assert_eq!(forward.root(), backward.root());
    }

    #[test]
    fn test_removing_every_key_restores_the_empty_root() {
        let mut map = Map::new();
        for i in 0..16u64 {
            map.insert(digest(i), digest(i)).unwrap();
        }
        for i in 0..16u64 {
            map.remove(digest(i)).unwrap();
        }
        assert_eq!(map.root(), ZERO_DIGEST);
        assert!(map.is_empty());
        assert_eq!(map.inner().get_node(&map.leaf_of(&digest(0), &digest(0))), None);
    }
}
