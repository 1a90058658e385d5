use std::fmt;

use alloy_primitives::{Address, I256, U256};
use eyre::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cursor::StorageCursor,
    slot::slot_hash,
    store::WordStore,
    ty::{StorageType, StructDef},
    value::StorageValue,
};

/// Safety limits for a single decode call.
///
/// Lengths come out of storage words, so a corrupted or adversarial header can
/// declare containers of absurd size; the depth limit plays the same role for
/// malformed type descriptions. Hitting either limit aborts the decode of that
/// one variable (no value produced) rather than failing the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeLimits {
    /// Maximum element count (arrays) or byte length (`bytes`/`string`) a
    /// dynamic container may declare before decoding is refused.
    pub max_length: u64,
    /// Maximum declared-type nesting depth.
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_length: 0x10000, max_depth: 64 }
    }
}

/// Decodes source-level values out of a raw storage snapshot by replaying the
/// compiler's layout rules.
///
/// Every decode returns one of three outcomes:
/// - `Ok(Some((value, cursor)))`: the decoded value plus the cursor where the
///   next sibling value would continue;
/// - `Ok(None)`: a data-driven abort (length over [`DecodeLimits`], an
///   unresolved field type) — the variable is not displayable, but the caller
///   may keep decoding others;
/// - `Err(_)`: an internal-consistency fault, e.g. a value that cannot fit in
///   the space the cursor claims remains. These indicate a contract violation
///   between the type system and the decoder and are never recovered.
pub struct StorageDecoder<'a, S: WordStore + ?Sized> {
    store: &'a S,
    limits: DecodeLimits,
}

impl<S: WordStore + ?Sized> fmt::Debug for StorageDecoder<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageDecoder").field("limits", &self.limits).finish_non_exhaustive()
    }
}

impl<'a, S: WordStore + ?Sized> StorageDecoder<'a, S> {
    /// New decoder over `store` with default limits.
    pub fn new(store: &'a S) -> Self {
        Self::with_limits(store, DecodeLimits::default())
    }

    /// New decoder over `store` with the given limits.
    pub fn with_limits(store: &'a S, limits: DecodeLimits) -> Self {
        Self { store, limits }
    }

    /// Returns the limits this decoder enforces.
    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Decodes a value of type `ty` at `cursor`, returning the value and the
    /// advanced cursor.
    ///
    /// The cursor is not realigned here: callers position it, typically at a
    /// variable's base slot or via [`StorageCursor::align_for`] when chaining
    /// sibling values.
    pub fn decode(
        &self,
        ty: &StorageType,
        cursor: StorageCursor,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        self.decode_at(ty, cursor, 0)
    }

    fn decode_at(
        &self,
        ty: &StorageType,
        cursor: StorageCursor,
        depth: usize,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        if depth > self.limits.max_depth {
            warn!(
                ty = %ty,
                slot = %cursor.slot,
                max_depth = self.limits.max_depth,
                "type nesting exceeds the decode depth limit"
            );
            return Ok(None);
        }

        match ty {
            StorageType::Uint(bits) => self.decode_integer(ty, cursor, *bits, false).map(Some),
            StorageType::Int(bits) => self.decode_integer(ty, cursor, *bits, true).map(Some),
            StorageType::Bool => {
                let (raw, cursor) = self.read_value(ty, cursor, 1)?;
                Ok(Some((StorageValue::Bool(raw[0] != 0), cursor)))
            }
            StorageType::Address | StorageType::Contract => {
                let (raw, cursor) = self.read_value(ty, cursor, 20)?;
                Ok(Some((StorageValue::Address(Address::from_slice(&raw)), cursor)))
            }
            StorageType::FixedBytes(size) => {
                // raw bytes, kept in storage order
                let (raw, cursor) = self.read_value(ty, cursor, usize::from(*size))?;
                Ok(Some((StorageValue::Bytes(raw.into()), cursor)))
            }
            StorageType::Enum(def) => {
                let (raw, cursor) = self.read_value(ty, cursor, def.storage_bytes())?;
                Ok(Some((StorageValue::Uint(U256::from_be_slice(&raw)), cursor)))
            }
            StorageType::Alias(def) => match &def.underlying {
                Some(underlying) => self.decode_at(underlying, cursor, depth + 1),
                None => {
                    debug!(alias = %def.name, slot = %cursor.slot, "unresolved underlying type");
                    Ok(None)
                }
            },
            StorageType::Struct(def) => self.decode_struct(def, cursor, depth),
            StorageType::FixedArray { elem, len } => {
                self.decode_fixed_array(ty, elem, *len, cursor, depth)
            }
            StorageType::DynArray { elem } => self.decode_dyn_array(ty, elem, cursor, depth),
            StorageType::Bytes | StorageType::String => self.decode_bytes_like(ty, cursor),
            StorageType::Mapping { .. } => bail!(
                "cannot decode {ty} at slot {}: mapping contents are not enumerable from a \
                 storage snapshot",
                cursor.slot
            ),
        }
    }

    /// Reads the `size` bytes a value type occupies at `cursor` and advances
    /// past them. A width that does not fit in the remaining word space means
    /// the caller skipped the packing rule.
    fn read_value(
        &self,
        ty: &StorageType,
        cursor: StorageCursor,
        size: usize,
    ) -> Result<(Vec<u8>, StorageCursor)> {
        ensure!(
            size <= cursor.end,
            "{ty} needs {size} bytes but only {} remain in slot {}",
            cursor.end,
            cursor.slot
        );
        let word = self.store.fetch_word(cursor.slot);
        let raw = word[cursor.end - size..cursor.end].to_vec();
        Ok((raw, cursor.consume(size)))
    }

    fn decode_integer(
        &self,
        ty: &StorageType,
        cursor: StorageCursor,
        bits: u16,
        signed: bool,
    ) -> Result<(StorageValue, StorageCursor)> {
        let bits = usize::from(bits);
        let slot = cursor.slot;
        let (raw, cursor) = self.read_value(ty, cursor, bits / 8)?;
        let magnitude = U256::from_be_slice(&raw);

        let value = if signed {
            let value = if bits < 256 && magnitude.bit(bits - 1) {
                // two's complement: sign-extend the stored pattern
                I256::from_raw(magnitude | (U256::MAX << bits))
            } else {
                I256::from_raw(magnitude)
            };
            if bits < 256 {
                let bound = I256::from_raw(U256::from(1) << (bits - 1));
                ensure!(
                    value >= -bound && value <= bound - I256::ONE,
                    "decoded {value} is out of range for {ty} at slot {slot}"
                );
            }
            StorageValue::Int(value)
        } else {
            if bits < 256 {
                ensure!(
                    magnitude < U256::from(1) << bits,
                    "decoded {magnitude} is out of range for {ty} at slot {slot}"
                );
            }
            StorageValue::Uint(magnitude)
        };
        Ok((value, cursor))
    }

    fn decode_struct(
        &self,
        def: &StructDef,
        cursor: StorageCursor,
        depth: usize,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        self.require_fresh("struct", &def.name, cursor)?;

        let mut fields = Vec::with_capacity(def.fields.len());
        let mut cur = cursor;
        for field in &def.fields {
            let Some(field_ty) = &field.ty else {
                debug!(
                    strct = %def.name,
                    field = %field.name,
                    "unresolved field type, aborting struct decode"
                );
                return Ok(None);
            };
            cur = cur.align_for(field_ty);
            let Some((value, next)) = self.decode_at(field_ty, cur, depth + 1)? else {
                return Ok(None);
            };
            fields.push((field.name.clone(), value));
            cur = next;
        }
        Ok(Some((StorageValue::Struct(fields), cur)))
    }

    fn decode_fixed_array(
        &self,
        ty: &StorageType,
        elem: &StorageType,
        len: u64,
        cursor: StorageCursor,
        depth: usize,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        self.require_fresh("array", ty, cursor)?;
        if len > self.limits.max_length {
            warn!(ty = %ty, slot = %cursor.slot, len, max = self.limits.max_length, "array length exceeds the decode limit");
            return Ok(None);
        }

        // Elements are packed starting directly at the declared slot.
        let mut elems = Vec::with_capacity(len as usize);
        let mut cur = cursor;
        for _ in 0..len {
            cur = cur.align_for(elem);
            let Some((value, next)) = self.decode_at(elem, cur, depth + 1)? else {
                return Ok(None);
            };
            elems.push(value);
            cur = next;
        }
        // The body always owns whole words: round past the last element's
        // word, even when it ended exactly on a word boundary.
        Ok(Some((StorageValue::Array(elems), cur.next_word())))
    }

    fn decode_dyn_array(
        &self,
        ty: &StorageType,
        elem: &StorageType,
        cursor: StorageCursor,
        depth: usize,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        self.require_fresh("array", ty, cursor)?;

        let len = U256::from_be_bytes(self.store.fetch_word(cursor.slot).0);
        if len > U256::from(self.limits.max_length) {
            warn!(ty = %ty, slot = %cursor.slot, len = %len, max = self.limits.max_length, "array length exceeds the decode limit");
            return Ok(None);
        }
        let len = len.to::<u64>();

        let mut elems = Vec::with_capacity(len as usize);
        let mut cur = StorageCursor::new(slot_hash(cursor.slot));
        for _ in 0..len {
            cur = cur.align_for(elem);
            let Some((value, next)) = self.decode_at(elem, cur, depth + 1)? else {
                return Ok(None);
            };
            elems.push(value);
            cur = next;
        }
        // One slot consumed at the declaration site, however large the body.
        Ok(Some((StorageValue::Array(elems), cursor.next_word())))
    }

    fn decode_bytes_like(
        &self,
        ty: &StorageType,
        cursor: StorageCursor,
    ) -> Result<Option<(StorageValue, StorageCursor)>> {
        self.require_fresh("container", ty, cursor)?;

        let header = self.store.fetch_word(cursor.slot);
        let payload = if header[31] % 2 == 0 {
            // short form: data left-aligned in the header word, doubled
            // length in the low byte
            let len = usize::from(header[31]) / 2;
            if len > 31 {
                warn!(ty = %ty, slot = %cursor.slot, len, "short-form length byte is out of range");
                return Ok(None);
            }
            header[..len].to_vec()
        } else {
            // long form: the header holds 2 * length + 1, data lives at the
            // keccak image of the declared slot
            let len = (U256::from_be_bytes(header.0) - U256::from(1)) / U256::from(2);
            if len > U256::from(self.limits.max_length) {
                warn!(ty = %ty, slot = %cursor.slot, len = %len, max = self.limits.max_length, "length exceeds the decode limit");
                return Ok(None);
            }
            self.store.fetch_bytes(slot_hash(cursor.slot), 0, len.to::<u64>() as usize)
        };

        let value = match ty {
            StorageType::String => {
                StorageValue::String(String::from_utf8_lossy(&payload).into_owned())
            }
            _ => StorageValue::Bytes(payload.into()),
        };
        Ok(Some((value, cursor.next_word())))
    }

    fn require_fresh(
        &self,
        kind: &str,
        name: &dyn fmt::Display,
        cursor: StorageCursor,
    ) -> Result<()> {
        ensure!(
            cursor.is_fresh(),
            "{kind} {name} must start at a word boundary, but the cursor is at slot {} with {} \
             bytes left",
            cursor.slot,
            cursor.end
        );
        Ok(())
    }
}
