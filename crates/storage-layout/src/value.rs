use alloy_primitives::{Address, Bytes, I256, U256};
use serde::{Deserialize, Serialize};

/// A decoded storage value, mirroring [`StorageType`](crate::StorageType).
///
/// Composites are built immutably field-by-field / element-by-element during
/// decoding; struct fields keep their declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageValue {
    /// Unsigned integers, including enum ordinals.
    Uint(U256),
    Int(I256),
    Bool(bool),
    /// Addresses and contract references.
    Address(Address),
    /// Raw bytes: `bytesN` contents and dynamic `bytes` payloads.
    Bytes(Bytes),
    String(String),
    /// Array elements in index order.
    Array(Vec<StorageValue>),
    /// Struct fields as `(name, value)` in declaration order.
    Struct(Vec<(String, StorageValue)>),
}

impl StorageValue {
    /// Returns the unsigned integer, if this is one.
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the signed integer, if this is one.
    pub fn as_int(&self) -> Option<I256> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the named struct field, if this is a struct containing it.
    pub fn field(&self, name: &str) -> Option<&StorageValue> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_preserves_names() {
        let value = StorageValue::Struct(vec![
            ("x".to_string(), StorageValue::Uint(U256::from(1))),
            ("y".to_string(), StorageValue::Bool(true)),
        ]);
        assert_eq!(value.field("y"), Some(&StorageValue::Bool(true)));
        assert_eq!(value.field("z"), None);
        assert_eq!(value.as_uint(), None);
    }

    #[test]
    fn serializes_to_json() {
        let value = StorageValue::Array(vec![
            StorageValue::Uint(U256::from(7)),
            StorageValue::String("ok".to_string()),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let back: StorageValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
