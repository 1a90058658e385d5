//! # sdb-storage-layout
//!
//! SDB's storage-layout decoder.
//!
//! Given a read-only snapshot of a contract's storage (a sparse mapping from
//! 256-bit slot addresses to 32-byte words) and the declared source-level type
//! of a variable, this crate reconstructs the structured value the variable
//! holds by replaying the compiler's layout rules: right-to-left packing of
//! small value types within a word, keccak-derived payload slots for dynamic
//! containers, and the short/long split for `bytes` and `string`.
//!
//! Decoding is a pure function of `(type, cursor, store)`: it never writes to
//! storage and a given input triple always produces the same outcome, so the
//! decoder may be shared freely across threads over an immutable snapshot.

#[macro_use]
extern crate tracing;

mod cursor;
mod decoder;
mod slot;
mod store;
mod ty;
mod value;

pub use cursor::StorageCursor;
pub use decoder::{DecodeLimits, StorageDecoder};
pub use slot::slot_hash;
pub use store::{StorageSnapshot, WordStore};
pub use ty::{AliasDef, EnumDef, FieldDef, StorageType, StructDef};
pub use value::StorageValue;
