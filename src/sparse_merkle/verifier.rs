//! Proof verification without access to a tree.
//!
//! A proof is the tuple `(leaf, index, enables, siblings)`. Bit `i` of `index` says whether the
//! path turns right (1) or left (0) at level `i`, counting from the leaf. Bit `i` of `enables`
//! says whether level `i` has a nonempty sibling. The nonempty siblings appear in `siblings` in
//! ascending level order, and every other sibling is the zero digest.
//!
//! Two implementations of the fold are provided. [`compute_root`] reads bits by position.
//! [`compute_root_packed`] consumes both words by shifting them right one bit per level and pulls
//! siblings from an iterator, which is the shape a verifier takes when it is ported to a host that
//! works on whole 256-bit words. Both accept and reject exactly the same inputs.

use super::error::ProofError;
use super::tree::SparseMerkleHash;
use super::utils::{Word, MAX_DEPTH};
use super::{Digest, ZERO_DIGEST};

/// Checks the shape of a proof against the claimed depth, before any hashing happens
fn check_shape(
    depth: usize,
    index: &Word,
    enables: &Word,
    num_siblings: usize,
) -> Result<(), ProofError> {
    if depth > MAX_DEPTH {
        return Err(ProofError::DepthTooLarge { depth });
    }
    if !index.fits_in(depth) {
        return Err(ProofError::IndexOutOfRange {
            index: *index,
            depth,
        });
    }
    if !enables.fits_in(depth) {
        return Err(ProofError::EnablesOutOfRange {
            enables: *enables,
            depth,
        });
    }
    let expected = enables.count_ones() as usize;
    if expected != num_siblings {
        return Err(ProofError::SiblingCountMismatch {
            expected,
            actual: num_siblings,
        });
    }
    Ok(())
}

/// Reconstructs the root implied by a proof, folding from the leaf upwards.
pub fn compute_root<H: SparseMerkleHash + ?Sized>(
    hasher: &H,
    depth: usize,
    leaf: &Digest,
    index: &Word,
    enables: &Word,
    siblings: &[Digest],
) -> Result<Digest, ProofError> {
    check_shape(depth, index, enables, siblings.len())?;

    let mut acc = *leaf;
    let mut consumed = 0;
    for level in 0..depth {
        let sibling = if enables.bit(level) {
            let sibling = siblings[consumed];
            consumed += 1;
            sibling
        } else {
            ZERO_DIGEST
        };
        acc = if index.bit(level) {
            hasher.hash_nodes(&sibling, &acc)
        } else {
            hasher.hash_nodes(&acc, &sibling)
        };
    }
    Ok(acc)
}

/// Reconstructs the root implied by a proof, consuming `index` and `enables` one low bit at a
/// time. Agrees with [`compute_root`] on every input.
pub fn compute_root_packed<H: SparseMerkleHash + ?Sized>(
    hasher: &H,
    depth: usize,
    leaf: &Digest,
    index: &Word,
    enables: &Word,
    siblings: &[Digest],
) -> Result<Digest, ProofError> {
    check_shape(depth, index, enables, siblings.len())?;

    let mut path = *index;
    let mut mask = *enables;
    let mut siblings = siblings.iter();
    let mut acc = *leaf;
    for _ in 0..depth {
        let sibling = match mask.low_bit() {
            true => siblings.next().copied().unwrap_or(ZERO_DIGEST),
            false => ZERO_DIGEST,
        };
        acc = match path.low_bit() {
            true => hasher.hash_nodes(&sibling, &acc),
            false => hasher.hash_nodes(&acc, &sibling),
        };
        path.shr1();
        mask.shr1();
    }
    Ok(acc)
}

/// Checks that a proof reconstructs the expected root.
pub fn verify_membership<H: SparseMerkleHash + ?Sized>(
    hasher: &H,
    depth: usize,
    root: &Digest,
    leaf: &Digest,
    index: &Word,
    enables: &Word,
    siblings: &[Digest],
) -> Result<(), ProofError> {
    let computed = compute_root(hasher, depth, leaf, index, enables, siblings)?;
    if &computed == root {
        return Ok(());
    }
    Err(ProofError::InvalidRoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maybestd::vec::Vec;
    use crate::sparse_merkle::db::MemDb;
    use crate::sparse_merkle::tree::SparseMerkleTree;
    use crate::Sha2Hasher;
    use proptest::prelude::*;

    fn value(x: u64) -> Digest {
        Sha2Hasher::hash_bytes(&x.to_be_bytes())
    }

    fn word_below(depth: usize) -> impl Strategy<Value = Word> {
        any::<[u8; 32]>().prop_map(move |bytes| {
            let mut word = Word::ZERO;
            let source = Word(bytes);
            for i in 0..depth {
                if source.bit(i) {
                    word.set_bit(i);
                }
            }
            word
        })
    }

    /// A random proof shape: a depth, then an index and enables bitmap that fit it, then exactly
    /// as many siblings as the bitmap calls for
    fn arbitrary_proof() -> impl Strategy<Value = (usize, Digest, Word, Word, Vec<Digest>)> {
        (0..=MAX_DEPTH)
            .prop_flat_map(|depth| (Just(depth), word_below(depth), word_below(depth)))
            .prop_flat_map(|(depth, index, enables)| {
                let count = enables.count_ones() as usize;
                (
                    Just(depth),
                    any::<[u8; 32]>(),
                    Just(index),
                    Just(enables),
                    proptest::collection::vec(any::<[u8; 32]>(), count..=count),
                )
            })
    }

    proptest! {
        #[test]
        fn test_reference_and_packed_verifiers_agree(
            (depth, leaf, index, enables, siblings) in arbitrary_proof()
        ) {
            let reference = compute_root(&Sha2Hasher, depth, &leaf, &index, &enables, &siblings);
            let packed = compute_root_packed(&Sha2Hasher, depth, &leaf, &index, &enables, &siblings);
            prop_assert!(reference.is_ok());
            prop_assert_eq!(reference, packed);
        }

        #[test]
        fn test_verifiers_agree_on_malformed_proofs(
            (depth, leaf, index, enables, mut siblings) in arbitrary_proof(),
            extra in any::<[u8; 32]>(),
        ) {
            siblings.push(extra);
            let reference = compute_root(&Sha2Hasher, depth, &leaf, &index, &enables, &siblings);
            let packed = compute_root_packed(&Sha2Hasher, depth, &leaf, &index, &enables, &siblings);
            prop_assert_eq!(reference, packed);
            prop_assert_eq!(
                reference,
                Err(ProofError::SiblingCountMismatch {
                    expected: siblings.len() - 1,
                    actual: siblings.len()
                })
            );
        }
    }

    #[test]
    fn test_empty_tree_non_membership() {
        for depth in [0usize, 1, 8, 200, MAX_DEPTH] {
            let root = compute_root(
                &Sha2Hasher,
                depth,
                &ZERO_DIGEST,
                &Word::ZERO,
                &Word::ZERO,
                &[],
            )
            .unwrap();
            assert_eq!(root, ZERO_DIGEST);
        }
    }

    #[test]
    fn test_depth_zero_root_is_the_leaf() {
        let leaf = value(1);
        assert_eq!(
            compute_root(&Sha2Hasher, 0, &leaf, &Word::ZERO, &Word::ZERO, &[]).unwrap(),
            leaf
        );
    }

    #[test]
    fn test_capacity_is_enforced() {
        for depth in [0usize, 1, 8] {
            let mut index = Word::ZERO;
            index.set_bit(depth);
            let result = compute_root(&Sha2Hasher, depth, &value(1), &index, &Word::ZERO, &[]);
            assert_eq!(result, Err(ProofError::IndexOutOfRange { index, depth }));
            let packed =
                compute_root_packed(&Sha2Hasher, depth, &value(1), &index, &Word::ZERO, &[]);
            assert_eq!(packed, result);
        }
        // At full width every index fits, but the depth itself is bounded
        let all_ones = Word([0xff; 32]);
        assert!(compute_root(&Sha2Hasher, MAX_DEPTH, &value(1), &all_ones, &Word::ZERO, &[]).is_ok());
        assert_eq!(
            compute_root(&Sha2Hasher, MAX_DEPTH + 1, &value(1), &Word::ZERO, &Word::ZERO, &[]),
            Err(ProofError::DepthTooLarge {
                depth: MAX_DEPTH + 1
            })
        );
    }

    #[test]
    fn test_enables_above_depth_are_rejected() {
        let mut enables = Word::ZERO;
        enables.set_bit(8);
        assert_eq!(
            compute_root(&Sha2Hasher, 8, &value(1), &Word::ZERO, &enables, &[value(2)]),
            Err(ProofError::EnablesOutOfRange { enables, depth: 8 })
        );
    }

    #[test]
    fn test_missing_sibling_is_rejected() {
        let enables = Word::from(0b11u64);
        assert_eq!(
            compute_root(&Sha2Hasher, 8, &value(1), &Word::ZERO, &enables, &[value(2)]),
            Err(ProofError::SiblingCountMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_flipping_an_enables_bit_breaks_the_proof() {
        let mut tree = SparseMerkleTree::<MemDb, Sha2Hasher>::new(16).unwrap();
        for i in 0..50u64 {
            tree.insert(&Word::from(i * 1031 % 65536), value(i)).unwrap();
        }
        let root = tree.root();
        let proof = tree.prove(&Word::from(1031u64)).unwrap();
        assert!(proof.enables.count_ones() >= 2);

        for level in 0..16 {
            let tampered = proof.enables.with_bit_flipped(level);
            let mut siblings = proof.siblings.clone();
            // Keep the sibling count consistent so the failure comes from the fold itself
            if tampered.count_ones() > proof.enables.count_ones() {
                siblings.push(value(999));
            } else {
                siblings.pop();
            }
            let result = verify_membership(
                &Sha2Hasher,
                16,
                &root,
                &proof.leaf,
                &proof.index,
                &tampered,
                &siblings,
            );
            assert_eq!(result, Err(ProofError::InvalidRoot));
        }
    }

    #[test]
    fn test_flipping_an_index_bit_breaks_the_proof() {
        let mut tree = SparseMerkleTree::<MemDb, Sha2Hasher>::new(8).unwrap();
        tree.insert(&Word::from(3u64), value(3)).unwrap();
        tree.insert(&Word::from(77u64), value(77)).unwrap();
        let root = tree.root();
        let proof = tree.prove(&Word::from(3u64)).unwrap();
        for level in 0..8 {
            let result = verify_membership(
                &Sha2Hasher,
                8,
                &root,
                &proof.leaf,
                &proof.index.with_bit_flipped(level),
                &proof.enables,
                &proof.siblings,
            );
            assert_eq!(result, Err(ProofError::InvalidRoot));
        }
    }
}
