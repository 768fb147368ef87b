use super::{Digest, HASH_LEN};
use crate::maybestd::fmt;

/// The maximum depth of a tree, which is also the width of an index in bits
pub const MAX_DEPTH: usize = HASH_LEN * 8;

/// An unsigned 256-bit integer, stored as 32 big-endian bytes.
///
/// Words are used for leaf indices and for the `enables` bitmap of a proof. Bit 0 is the least
/// significant bit, which in both uses refers to the level nearest the leaves.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Default)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word(pub [u8; HASH_LEN]);

impl Word {
    /// The zero word
    pub const ZERO: Word = Word([0u8; HASH_LEN]);

    /// Returns the big-endian bytes of the word
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns true if bit `i` is set. Bits at or above [`MAX_DEPTH`] are never set.
    pub fn bit(&self, i: usize) -> bool {
        if i >= MAX_DEPTH {
            return false;
        }
        let byte = self.0[HASH_LEN - 1 - i / 8];
        (byte >> (i % 8)) & 1 == 1
    }

    /// Sets bit `i`. Panics if `i >= MAX_DEPTH`.
    pub fn set_bit(&mut self, i: usize) {
        assert!(i < MAX_DEPTH, "bit {} out of range", i);
        self.0[HASH_LEN - 1 - i / 8] |= 1 << (i % 8);
    }

    /// Returns a copy of the word with bit `i` flipped. Panics if `i >= MAX_DEPTH`.
    pub fn with_bit_flipped(mut self, i: usize) -> Self {
        assert!(i < MAX_DEPTH, "bit {} out of range", i);
        self.0[HASH_LEN - 1 - i / 8] ^= 1 << (i % 8);
        self
    }

    /// Returns the least significant bit
    pub fn low_bit(&self) -> bool {
        self.0[HASH_LEN - 1] & 1 == 1
    }

    /// Shifts the word right by one bit, in place
    pub fn shr1(&mut self) {
        let mut carry = 0u8;
        for byte in self.0.iter_mut() {
            let next_carry = *byte & 1;
            *byte = (*byte >> 1) | (carry << 7);
            carry = next_carry;
        }
    }

    /// Returns the number of set bits
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    /// Returns the number of significant bits, i.e. the position of the highest set bit plus one
    pub fn bit_len(&self) -> usize {
        match self.0.iter().position(|b| *b != 0) {
            Some(i) => (HASH_LEN - i) * 8 - self.0[i].leading_zeros() as usize,
            None => 0,
        }
    }

    /// Returns true if the word is strictly less than `2^bits`
    pub fn fits_in(&self, bits: usize) -> bool {
        self.bit_len() <= bits
    }

    /// Returns true if the word is zero
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        let mut out = Word::ZERO;
        out.0[HASH_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        out
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        let mut out = Word::ZERO;
        out.0[HASH_LEN - 16..].copy_from_slice(&value.to_be_bytes());
        out
    }
}

impl From<Digest> for Word {
    fn from(value: Digest) -> Self {
        Word(value)
    }
}

impl From<Word> for Digest {
    fn from(value: Word) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for Word {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::LowerHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#x})", self)
    }
}
