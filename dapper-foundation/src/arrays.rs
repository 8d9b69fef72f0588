// Dapper - dapper-foundation
// Module: Typed Array Views
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Shared byte buffers and the typed views the host hands to modules.
//!
//! A [`ByteBuffer`] owns a fixed-length run of bytes behind a shared lock.
//! [`Uint8View`] and [`Int32View`] window into a buffer without copying, so a
//! subview and its parent observe each other's writes. Every element access
//! is bounds-checked and reports [`codes::INDEX_OUT_OF_RANGE`] instead of
//! panicking.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use dapper_error::{codes, helpers, Error, ErrorCategory, Result};

/// Size in bytes of one [`Int32View`] element
pub const INT32_ELEMENT_SIZE: usize = 4;

/// Fixed-length byte storage shared between views.
#[derive(Clone, Default)]
pub struct ByteBuffer {
    bytes:  Arc<RwLock<Vec<u8>>>,
    len:    usize,
    origin: u32,
}

impl ByteBuffer {
    /// Create a zero-filled buffer of `len` bytes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Take ownership of `bytes` as a host-owned buffer.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::with_origin(bytes, 0)
    }

    /// Wrap bytes that were copied out of linear memory at `origin`.
    #[must_use]
    pub fn with_origin(bytes: Vec<u8>, origin: u32) -> Self {
        let len = bytes.len();
        Self {
            bytes: Arc::new(RwLock::new(bytes)),
            len,
            origin,
        }
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear memory address the bytes came from, 0 for host-owned data
    #[must_use]
    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Whether both buffers share the same storage
    #[must_use]
    pub fn same_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Copy the whole buffer out.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.read(|bytes| bytes.to_vec())
    }

    fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let guard = self.bytes.read().map_err(|_| helpers::poisoned_lock("byte buffer"))?;
        Ok(f(&guard))
    }

    fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let mut guard = self.bytes.write().map_err(|_| helpers::poisoned_lock("byte buffer"))?;
        Ok(f(&mut guard))
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Validate `offset`/`length` against a buffer of `total` bytes.
///
/// `offset` is in bytes, `length` in elements of `element_size` bytes. A
/// missing length runs to the end of the buffer. Returns `(offset, length)`.
fn resolve_range(
    total: usize,
    offset: i64,
    length: Option<i64>,
    element_size: usize,
) -> Result<(usize, usize)> {
    if offset < 0 {
        return Err(helpers::invalid_argument(format!("offset {offset} must not be negative")));
    }
    let offset = offset as usize;
    if offset > total {
        return Err(helpers::invalid_argument(format!(
            "offset {offset} exceeds source length {total}"
        )));
    }
    let length = match length {
        Some(length) if length < 0 => {
            return Err(helpers::invalid_argument(format!(
                "length {length} must not be negative"
            )));
        }
        Some(length) => length as usize,
        None => (total - offset) / element_size,
    };
    let end = length
        .checked_mul(element_size)
        .and_then(|bytes| bytes.checked_add(offset))
        .ok_or_else(|| helpers::invalid_argument("view range overflows"))?;
    if end > total {
        return Err(helpers::invalid_argument(format!(
            "offset {offset} + length {length} exceeds source length {total}"
        )));
    }
    Ok((offset, length))
}

fn checked_index(index: i64, len: usize) -> Result<usize> {
    if index < 0 || index as u64 >= len as u64 {
        return Err(helpers::index_out_of_range(index, len));
    }
    Ok(index as usize)
}

/// Byte view over a [`ByteBuffer`].
#[derive(Clone, Default)]
pub struct Uint8View {
    buffer: ByteBuffer,
    offset: usize,
    length: usize,
}

impl Uint8View {
    /// Create a view over `source` starting at `offset` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`codes::INVALID_ARGUMENT`] for a negative offset or length, or
    /// when the range does not fit inside `source`.
    pub fn new(source: &ByteBuffer, offset: i64, length: Option<i64>) -> Result<Self> {
        let (offset, length) = resolve_range(source.len(), offset, length, 1)?;
        Ok(Self {
            buffer: source.clone(),
            offset,
            length,
        })
    }

    /// View over a fresh buffer holding `bytes`.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        Self {
            buffer: ByteBuffer::from_vec(bytes),
            offset: 0,
            length,
        }
    }

    /// View over a copy of `bytes`.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Zero-filled view of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the view is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Underlying storage
    #[must_use]
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Byte offset of the view inside its buffer
    #[must_use]
    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Address of the first element in the buffer's origin space
    #[must_use]
    pub fn address(&self) -> u32 {
        self.buffer.origin().wrapping_add(self.offset as u32)
    }

    /// Read element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`codes::INDEX_OUT_OF_RANGE`] when `index` is negative or not
    /// below [`len`](Self::len).
    pub fn get(&self, index: i64) -> Result<u8> {
        let index = checked_index(index, self.length)?;
        self.buffer.read(|bytes| bytes[self.offset + index])
    }

    /// Write element `index`.
    pub fn set_at(&self, index: i64, value: u8) -> Result<()> {
        let index = checked_index(index, self.length)?;
        self.buffer.write(|bytes| bytes[self.offset + index] = value)
    }

    /// Copy `min(self.len(), source.len())` elements from `source`.
    ///
    /// Returns `self.len()`, matching the typed-array `set` contract the
    /// module expects.
    pub fn set(&self, source: &Uint8View) -> Result<usize> {
        let data = source.to_vec()?;
        self.set_bytes(&data)
    }

    /// Copy `min(self.len(), bytes.len())` bytes into the view.
    pub fn set_bytes(&self, bytes: &[u8]) -> Result<usize> {
        let count = self.length.min(bytes.len());
        self.buffer.write(|dest| {
            dest[self.offset..self.offset + count].copy_from_slice(&bytes[..count]);
        })?;
        Ok(self.length)
    }

    /// Create a view sharing this view's storage.
    ///
    /// `offset` is relative to the start of this view.
    pub fn subview(&self, offset: i64, length: Option<i64>) -> Result<Self> {
        let (relative, length) = resolve_range(self.length, offset, length, 1)?;
        Ok(Self {
            buffer: self.buffer.clone(),
            offset: self.offset + relative,
            length,
        })
    }

    /// Copy the viewed bytes out.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.buffer.read(|bytes| bytes[self.offset..self.offset + self.length].to_vec())
    }
}

impl PartialEq for Uint8View {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_vec(), other.to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Uint8View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_vec() {
            Ok(bytes) => f.debug_tuple("Uint8View").field(&bytes).finish(),
            Err(_) => f.write_str("Uint8View(<poisoned>)"),
        }
    }
}

impl From<Vec<u8>> for Uint8View {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_vec(bytes)
    }
}

/// Little-endian 32-bit signed view over a [`ByteBuffer`].
#[derive(Clone, Default)]
pub struct Int32View {
    buffer: ByteBuffer,
    offset: usize,
    length: usize,
}

impl Int32View {
    /// Create a view over `source`.
    ///
    /// `byte_offset` counts bytes while `length` counts 32-bit elements, so
    /// the view covers `byte_offset .. byte_offset + 4 * length`.
    pub fn new(source: &ByteBuffer, byte_offset: i64, length: Option<i64>) -> Result<Self> {
        let (offset, length) =
            resolve_range(source.len(), byte_offset, length, INT32_ELEMENT_SIZE)?;
        Ok(Self {
            buffer: source.clone(),
            offset,
            length,
        })
    }

    /// Reinterpret part of a byte view as 32-bit elements.
    pub fn from_bytes(view: &Uint8View, byte_offset: i64, length: Option<i64>) -> Result<Self> {
        let (relative, length) =
            resolve_range(view.len(), byte_offset, length, INT32_ELEMENT_SIZE)?;
        Ok(Self {
            buffer: view.buffer.clone(),
            offset: view.offset + relative,
            length,
        })
    }

    /// View over a fresh buffer holding `values`.
    #[must_use]
    pub fn from_values(values: &[i32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        Self {
            length: values.len(),
            buffer: ByteBuffer::from_vec(bytes),
            offset: 0,
        }
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the view is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Underlying storage
    #[must_use]
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Address of the first element in the buffer's origin space
    #[must_use]
    pub fn address(&self) -> u32 {
        self.buffer.origin().wrapping_add(self.offset as u32)
    }

    /// Read element `index`.
    pub fn get(&self, index: i64) -> Result<i32> {
        let index = checked_index(index, self.length)?;
        let start = self.offset + index * INT32_ELEMENT_SIZE;
        self.buffer.read(|bytes| {
            let mut word = [0u8; INT32_ELEMENT_SIZE];
            word.copy_from_slice(&bytes[start..start + INT32_ELEMENT_SIZE]);
            i32::from_le_bytes(word)
        })
    }

    /// Write element `index`.
    pub fn set_at(&self, index: i64, value: i32) -> Result<()> {
        let index = checked_index(index, self.length)?;
        let start = self.offset + index * INT32_ELEMENT_SIZE;
        self.buffer.write(|bytes| {
            bytes[start..start + INT32_ELEMENT_SIZE].copy_from_slice(&value.to_le_bytes());
        })
    }

    /// Copy `min(self.len(), source.len())` elements from `source`.
    ///
    /// Returns `self.len()`.
    pub fn set(&self, source: &Int32View) -> Result<usize> {
        let values = source.to_vec()?;
        let count = self.length.min(values.len());
        for (index, value) in values.iter().take(count).enumerate() {
            self.set_at(index as i64, *value)?;
        }
        Ok(self.length)
    }

    /// Copy the viewed elements out.
    pub fn to_vec(&self) -> Result<Vec<i32>> {
        (0..self.length as i64).map(|index| self.get(index)).collect()
    }
}

impl PartialEq for Int32View {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_vec(), other.to_vec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Int32View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_vec() {
            Ok(values) => f.debug_tuple("Int32View").field(&values).finish(),
            Err(_) => f.write_str("Int32View(<poisoned>)"),
        }
    }
}

/// Property names a module may look up on a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    /// Element count
    Length,
    /// The whole backing buffer
    Buffer,
    /// Constructor `(source, offset, length)` for a view of the same kind
    Constructor,
    /// Bulk copy `set(source)`
    Set,
    /// Address of the first element
    Ptr,
}

impl ViewProperty {
    /// Look up a property by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "length" => Some(Self::Length),
            "buffer" => Some(Self::Buffer),
            "constructor" => Some(Self::Constructor),
            "set" => Some(Self::Set),
            "ptr" => Some(Self::Ptr),
            _ => None,
        }
    }

    /// Property name as the module spells it
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Buffer => "buffer",
            Self::Constructor => "constructor",
            Self::Set => "set",
            Self::Ptr => "ptr",
        }
    }
}

/// Error for an unknown view property name.
#[must_use]
pub fn unknown_property(name: &str) -> Error {
    Error::new(
        ErrorCategory::Parameter,
        codes::INVALID_ARGUMENT,
        format!("view has no property {name}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_offset_rejected() {
        let buffer = ByteBuffer::new(8);
        let err = Uint8View::new(&buffer, -1, None).unwrap_err();
        assert_eq!(err.code, codes::INVALID_ARGUMENT);
    }

    #[test]
    fn test_negative_length_rejected() {
        let buffer = ByteBuffer::new(8);
        let err = Uint8View::new(&buffer, 0, Some(-3)).unwrap_err();
        assert_eq!(err.code, codes::INVALID_ARGUMENT);
    }

    #[test]
    fn test_range_past_end_rejected() {
        let buffer = ByteBuffer::new(8);
        assert!(Uint8View::new(&buffer, 4, Some(4)).is_ok());
        let err = Uint8View::new(&buffer, 4, Some(5)).unwrap_err();
        assert_eq!(err.code, codes::INVALID_ARGUMENT);
    }

    #[test]
    fn test_index_bounds() {
        let view = Uint8View::from_slice(&[1, 2, 3]);
        assert_eq!(view.get(2).unwrap(), 3);
        assert_eq!(view.get(3).unwrap_err().code, codes::INDEX_OUT_OF_RANGE);
        assert_eq!(view.get(-1).unwrap_err().code, codes::INDEX_OUT_OF_RANGE);
        assert_eq!(view.set_at(3, 0).unwrap_err().code, codes::INDEX_OUT_OF_RANGE);
    }

    #[test]
    fn test_subview_shares_storage() {
        let parent = Uint8View::from_slice(&[0, 0, 0, 0, 0]);
        let child = parent.subview(1, Some(3)).unwrap();
        child.set_at(0, 0xAA).unwrap();
        assert_eq!(parent.get(1).unwrap(), 0xAA);
        parent.set_at(3, 0x55).unwrap();
        assert_eq!(child.get(2).unwrap(), 0x55);
        assert!(child.buffer().same_storage(parent.buffer()));
    }

    #[test]
    fn test_set_copies_min_and_returns_own_length() {
        let target = Uint8View::zeroed(4);
        let source = Uint8View::from_slice(&[9, 8]);
        assert_eq!(target.set(&source).unwrap(), 4);
        assert_eq!(target.to_vec().unwrap(), vec![9, 8, 0, 0]);

        let long = Uint8View::from_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(target.set(&long).unwrap(), 4);
        assert_eq!(target.to_vec().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_address_includes_origin() {
        let buffer = ByteBuffer::with_origin(vec![0; 16], 0x1000);
        let view = Uint8View::new(&buffer, 4, None).unwrap();
        assert_eq!(view.address(), 0x1004);
        assert_eq!(view.len(), 12);
    }

    #[test]
    fn test_int32_offset_in_bytes_length_in_elements() {
        let buffer = ByteBuffer::new(12);
        let words = Int32View::new(&buffer, 4, Some(2)).unwrap();
        assert_eq!(words.len(), 2);
        words.set_at(1, -2).unwrap();
        assert_eq!(buffer.to_vec().unwrap()[8..12], (-2i32).to_le_bytes());
        assert_eq!(Int32View::new(&buffer, 4, Some(3)).unwrap_err().code, codes::INVALID_ARGUMENT);
        assert_eq!(Int32View::new(&buffer, 0, None).unwrap().len(), 3);
    }

    #[test]
    fn test_int32_set() {
        let target = Int32View::from_values(&[0, 0, 0]);
        let source = Int32View::from_values(&[7, -7, 70, 700]);
        assert_eq!(target.set(&source).unwrap(), 3);
        assert_eq!(target.to_vec().unwrap(), vec![7, -7, 70]);
    }

    #[test]
    fn test_view_property_names() {
        for property in [
            ViewProperty::Length,
            ViewProperty::Buffer,
            ViewProperty::Constructor,
            ViewProperty::Set,
            ViewProperty::Ptr,
        ] {
            assert_eq!(ViewProperty::from_name(property.as_str()), Some(property));
        }
        assert_eq!(ViewProperty::from_name("byteLength"), None);
    }
}
