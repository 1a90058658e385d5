use alloy_primitives::{ruint::UintTryFrom, U256};

use crate::ty::StorageType;

/// A movable read head into storage: the slot being decoded plus the
/// exclusive upper byte boundary (within that slot's 32-byte word) of the
/// region still available to the next value.
///
/// Packed fields are right-aligned, so decoding walks a word from high byte
/// offsets down to low ones: the first value in a fresh word (`end == 32`)
/// occupies bytes `[32 - size, 32)`, the next `[32 - size' - size, 32 - size)`,
/// and so on. Invariant: `0 < end <= 32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageCursor {
    /// Slot address of the word currently being decoded.
    pub slot: U256,
    /// Exclusive upper byte boundary of the unconsumed region, in `(0, 32]`.
    pub end: usize,
}

impl StorageCursor {
    /// A cursor at the start of the word at `slot`.
    pub fn new<T>(slot: T) -> Self
    where
        U256: UintTryFrom<T>,
    {
        Self { slot: U256::from(slot), end: 32 }
    }

    /// Returns `true` if no byte of the current word has been consumed yet.
    pub fn is_fresh(&self) -> bool {
        self.end == 32
    }

    /// The cursor at the start of the following word.
    pub fn next_word(self) -> Self {
        Self { slot: self.slot.wrapping_add(U256::from(1)), end: 32 }
    }

    /// Consumes `size` bytes of the current word, rolling over to the next
    /// word once the current one is exhausted.
    ///
    /// Callers must have established `size <= self.end` (see
    /// [`StorageCursor::align_for`]).
    pub(crate) fn consume(self, size: usize) -> Self {
        debug_assert!(size <= self.end);
        match self.end - size {
            0 => self.next_word(),
            end => Self { slot: self.slot, end },
        }
    }

    /// The packing rule: returns the position where a value of type `ty` may
    /// start, given this cursor.
    ///
    /// A value type starts here only if its full width fits in the remaining
    /// `end` bytes of the current word; pointer-backed types (arrays, bytes,
    /// string, struct, mapping) always occupy a word of their own and start
    /// here only if the cursor is fresh. Anything else waits for the next
    /// word.
    pub fn align_for(self, ty: &StorageType) -> Self {
        match ty.value_size() {
            Some(size) if size <= self.end => self,
            Some(_) => self.next_word(),
            None if self.is_fresh() => self,
            None => self.next_word(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_word() {
        let cursor = StorageCursor::new(3u64);
        let cursor = cursor.consume(20);
        assert_eq!(cursor, StorageCursor { slot: U256::from(3), end: 12 });
        let cursor = cursor.consume(12);
        assert_eq!(cursor, StorageCursor::new(4u64));
    }

    #[test]
    fn align_packs_small_values() {
        let cursor = StorageCursor { slot: U256::ZERO, end: 5 };
        // a uint32 still fits in the 5 remaining bytes
        assert_eq!(cursor.align_for(&StorageType::Uint(32)), cursor);
        // a uint64 does not
        assert_eq!(cursor.align_for(&StorageType::Uint(64)), StorageCursor::new(1u64));
    }

    #[test]
    fn align_gives_pointers_a_fresh_word() {
        let fresh = StorageCursor::new(9u64);
        let bytes = StorageType::Bytes;
        assert_eq!(fresh.align_for(&bytes), fresh);

        let used = StorageCursor { slot: U256::from(9), end: 31 };
        assert_eq!(used.align_for(&bytes), StorageCursor::new(10u64));
    }

    #[test]
    fn next_word_wraps_at_top_of_address_space() {
        let cursor = StorageCursor::new(U256::MAX);
        assert_eq!(cursor.next_word().slot, U256::ZERO);
    }
}
