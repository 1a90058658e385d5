use alloy_primitives::{keccak256, B256, U256};

/// Derives the payload base slot of a dynamic container from its header slot:
/// `keccak256` of the slot's big-endian 32-byte encoding, read back as a
/// big-endian integer.
///
/// The compiler uses this derivation so that sibling containers' payloads land
/// in collision-resistant, effectively disjoint regions of the 2^256 slot
/// space.
pub fn slot_hash(slot: U256) -> U256 {
    U256::from_be_bytes(keccak256(B256::from(slot)).0)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::uint;

    use super::*;

    #[test]
    fn hash_of_slot_zero() {
        // keccak256 of 32 zero bytes, the payload base every dynamic
        // container declared at slot 0 uses.
        assert_eq!(
            slot_hash(U256::ZERO),
            uint!(0x290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563_U256),
        );
    }

    #[test]
    fn distinct_headers_hash_to_distinct_payloads() {
        assert_ne!(slot_hash(U256::from(7)), slot_hash(U256::from(8)));
    }
}
