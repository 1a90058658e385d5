use alloy_primitives::{ruint::UintTryFrom, B256, U256};
use rustc_hash::FxHashMap;

/// Read-only view of a contract's storage.
///
/// Storage is sparse: a slot that was never written has no entry, and the EVM
/// defines its value to be zero. [`WordStore::fetch_word`] bakes that rule in,
/// so the decoder never has to distinguish "missing" from "zero".
pub trait WordStore {
    /// Returns the raw word stored at `slot`, or `None` if the slot was never
    /// written.
    fn word(&self, slot: U256) -> Option<B256>;

    /// Returns the word at `slot`, defaulting absent slots to the zero word.
    fn fetch_word(&self, slot: U256) -> B256 {
        self.word(slot).unwrap_or(B256::ZERO)
    }

    /// Reads `len` bytes starting at byte `offset` of the word at `start`,
    /// continuing into consecutive slots whenever the offset wraps past the
    /// end of a word.
    ///
    /// Long `bytes`/`string` payloads are laid out this way: raw bytes packed
    /// back to back across the words rooted at the container's payload slot.
    fn fetch_bytes(&self, start: U256, offset: usize, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut slot = start;
        let mut offset = offset % 32;
        let mut word = self.fetch_word(slot);
        while out.len() < len {
            out.push(word[offset]);
            offset += 1;
            if offset == 32 && out.len() < len {
                offset = 0;
                slot = slot.wrapping_add(U256::from(1));
                word = self.fetch_word(slot);
            }
        }
        out
    }
}

impl<S: WordStore + ?Sized> WordStore for &S {
    fn word(&self, slot: U256) -> Option<B256> {
        (**self).word(slot)
    }
}

impl WordStore for FxHashMap<U256, B256> {
    fn word(&self, slot: U256) -> Option<B256> {
        self.get(&slot).copied()
    }
}

/// An owned, materialized storage snapshot.
///
/// This is what the debugger builds from an execution trace (the final value
/// of every touched slot) before handing it to the decoder.
#[derive(Clone, Debug, Default)]
pub struct StorageSnapshot {
    words: FxHashMap<U256, B256>,
}

impl StorageSnapshot {
    /// New empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the word stored at `slot`.
    pub fn insert<T>(&mut self, slot: T, word: B256)
    where
        U256: UintTryFrom<T>,
    {
        self.words.insert(U256::from(slot), word);
    }

    /// Returns the number of recorded slots.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if no slot has been recorded.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordStore for StorageSnapshot {
    fn word(&self, slot: U256) -> Option<B256> {
        self.words.get(&slot).copied()
    }
}

impl<K: Into<U256>> FromIterator<(K, B256)> for StorageSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, B256)>>(iter: I) -> Self {
        Self { words: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b256;

    use super::*;

    #[test]
    fn absent_slot_reads_as_zero() {
        let snapshot = StorageSnapshot::new();
        assert_eq!(snapshot.word(U256::from(42)), None);
        assert_eq!(snapshot.fetch_word(U256::from(42)), B256::ZERO);
    }

    #[test]
    fn fetch_bytes_within_one_word() {
        let mut snapshot = StorageSnapshot::new();
        snapshot.insert(
            0u64,
            b256!("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"),
        );
        assert_eq!(snapshot.fetch_bytes(U256::ZERO, 3, 4), vec![0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn fetch_bytes_straddles_words() {
        let mut snapshot = StorageSnapshot::new();
        snapshot.insert(
            7u64,
            b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
        );
        snapshot.insert(
            8u64,
            b256!("bbcc000000000000000000000000000000000000000000000000000000000000"),
        );
        assert_eq!(snapshot.fetch_bytes(U256::from(7), 31, 3), vec![0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn fetch_bytes_spans_missing_words() {
        let snapshot = StorageSnapshot::new();
        assert_eq!(snapshot.fetch_bytes(U256::from(100), 30, 5), vec![0; 5]);
    }
}
