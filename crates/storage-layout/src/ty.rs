use std::{fmt, sync::Arc};

/// The declared, source-level type of a storage variable.
///
/// This is a closed sum: the decoder matches on it exhaustively, so adding a
/// variant forces every dispatch site to say what it does with it. The
/// variants mirror what the compiler can lay out in storage, not what the
/// source language can express in memory or calldata.
///
/// Arrays, `bytes`, `string`, structs and mappings are *pointer-backed*: the
/// word at their declared slot is a header (inline short data or a length)
/// and any payload lives at a keccak-derived slot. Everything else is a
/// *value type* that packs directly into its slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageType {
    /// Unsigned integer of the given bit width (a multiple of 8, 8..=256).
    Uint(u16),
    /// Signed (two's complement) integer of the given bit width.
    Int(u16),
    Bool,
    Address,
    /// A reference to another contract; stored as its address.
    Contract,
    /// Fixed-size byte array `bytes1`..`bytes32`.
    FixedBytes(u8),
    /// Enumeration; stored as the ordinal in the narrowest byte width that
    /// holds the maximum member ordinal.
    Enum(Arc<EnumDef>),
    /// User-defined value type, transparently backed by another value type.
    Alias(Arc<AliasDef>),
    /// `T[len]`: elements laid out inline starting at the declared slot.
    FixedArray { elem: Box<StorageType>, len: u64 },
    /// `T[]`: length in the header slot, elements at its keccak image.
    DynArray { elem: Box<StorageType> },
    Bytes,
    String,
    Struct(Arc<StructDef>),
    /// Mappings keep their key/value types for external key-driven lookups,
    /// but their contents cannot be enumerated from a storage snapshot.
    Mapping { key: Box<StorageType>, value: Box<StorageType> },
}

/// An ordered, named-field aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// One struct field. `ty` is `None` when the front end failed to resolve the
/// field's source-level type; decoding such a struct aborts without a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Option<StorageType>,
}

/// An enumeration's declaration-ordered member names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

/// A user-defined value type. `underlying` is `None` when the front end could
/// not resolve the wrapped type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasDef {
    pub name: String,
    pub underlying: Option<StorageType>,
}

impl EnumDef {
    /// The number of bytes the compiler reserves for this enum: the smallest
    /// width whose unsigned range holds the maximum ordinal.
    pub fn storage_bytes(&self) -> usize {
        let max_ordinal = self.members.len().saturating_sub(1) as u64;
        let bits = 64 - max_ordinal.leading_zeros() as usize;
        bits.div_ceil(8).max(1)
    }
}

impl StorageType {
    /// The in-word byte width of a value type, or `None` for pointer-backed
    /// types (which always consume a whole header word).
    ///
    /// An [`StorageType::Alias`] whose underlying type is unresolved also
    /// returns `None`; its decode aborts before the width matters.
    pub fn value_size(&self) -> Option<usize> {
        match self {
            Self::Uint(bits) | Self::Int(bits) => Some(usize::from(*bits) / 8),
            Self::Bool => Some(1),
            Self::Address | Self::Contract => Some(20),
            Self::FixedBytes(size) => Some(usize::from(*size)),
            Self::Enum(def) => Some(def.storage_bytes()),
            Self::Alias(def) => def.underlying.as_ref()?.value_size(),
            Self::FixedArray { .. } |
            Self::DynArray { .. } |
            Self::Bytes |
            Self::String |
            Self::Struct(_) |
            Self::Mapping { .. } => None,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::Contract => f.write_str("contract"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Enum(def) => write!(f, "enum {}", def.name),
            Self::Alias(def) => f.write_str(&def.name),
            Self::FixedArray { elem, len } => write!(f, "{elem}[{len}]"),
            Self::DynArray { elem } => write!(f, "{elem}[]"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Struct(def) => write!(f, "struct {}", def.name),
            Self::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_of(n: usize) -> EnumDef {
        EnumDef {
            name: "E".to_string(),
            members: (0..n).map(|i| format!("M{i}")).collect(),
        }
    }

    #[test]
    fn enum_storage_width_follows_max_ordinal() {
        assert_eq!(enum_of(1).storage_bytes(), 1);
        assert_eq!(enum_of(2).storage_bytes(), 1);
        assert_eq!(enum_of(256).storage_bytes(), 1);
        assert_eq!(enum_of(257).storage_bytes(), 2);
        assert_eq!(enum_of(65536).storage_bytes(), 2);
        assert_eq!(enum_of(65537).storage_bytes(), 3);
    }

    #[test]
    fn value_sizes() {
        assert_eq!(StorageType::Uint(256).value_size(), Some(32));
        assert_eq!(StorageType::Int(8).value_size(), Some(1));
        assert_eq!(StorageType::Bool.value_size(), Some(1));
        assert_eq!(StorageType::Address.value_size(), Some(20));
        assert_eq!(StorageType::FixedBytes(12).value_size(), Some(12));
        assert_eq!(StorageType::Bytes.value_size(), None);
        assert_eq!(
            StorageType::FixedArray { elem: Box::new(StorageType::Bool), len: 2 }.value_size(),
            None,
        );
    }

    #[test]
    fn alias_size_is_transparent() {
        let alias = StorageType::Alias(Arc::new(AliasDef {
            name: "Duration".to_string(),
            underlying: Some(StorageType::Uint(64)),
        }));
        assert_eq!(alias.value_size(), Some(8));

        let unresolved = StorageType::Alias(Arc::new(AliasDef {
            name: "Mystery".to_string(),
            underlying: None,
        }));
        assert_eq!(unresolved.value_size(), None);
    }

    #[test]
    fn display_is_solidity_like() {
        let ty = StorageType::Mapping {
            key: Box::new(StorageType::Address),
            value: Box::new(StorageType::DynArray { elem: Box::new(StorageType::Uint(128)) }),
        };
        assert_eq!(ty.to_string(), "mapping(address => uint128[])");
    }
}
