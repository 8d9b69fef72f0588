// Dapper - dapper-runtime
// Module: Linear Memory Access
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Bounds-checked access to the module's linear memory.
//!
//! All scalar accesses are little-endian. Offsets are module addresses
//! (`u32`); any access that would leave the memory reports
//! [`codes::MEMORY_OUT_OF_BOUNDS`](dapper_error::codes::MEMORY_OUT_OF_BOUNDS)
//! instead of trapping.

use std::ops::Range;

use dapper_error::{helpers, Result};
use wasmi::{AsContext, AsContextMut, Memory};

use crate::{
    strings,
    value::{HeapView, ViewKind},
};

/// Handle to the module's linear memory.
#[derive(Debug, Clone, Copy)]
pub struct LinearMemory {
    memory: Memory,
}

impl LinearMemory {
    /// Wrap an engine memory.
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    /// The wrapped engine memory
    #[must_use]
    pub fn raw(&self) -> Memory {
        self.memory
    }

    /// Current size in bytes
    pub fn size(&self, ctx: impl AsContext) -> usize {
        self.memory.data(&ctx).len()
    }

    /// Byte view over the whole memory, as the module's `HEAPU8`.
    pub fn heap_u8(&self, ctx: impl AsContext) -> HeapView {
        HeapView {
            kind: ViewKind::Uint8,
            address: 0,
            length: self.size(ctx) as u32,
        }
    }

    fn check(&self, ctx: &impl AsContext, offset: u32, len: usize) -> Result<usize> {
        let size = self.memory.data(ctx).len();
        let end = u64::from(offset) + len as u64;
        if end > size as u64 {
            return Err(helpers::memory_out_of_bounds(u64::from(offset), len as u64, size));
        }
        Ok(offset as usize)
    }

    /// Copy `len` bytes starting at `offset`, the span `offset..offset + len`.
    pub fn read(&self, ctx: impl AsContext, offset: u32, len: usize) -> Result<Vec<u8>> {
        let start = self.check(&ctx, offset, len)?;
        Ok(self.memory.data(&ctx)[start..start + len].to_vec())
    }

    /// Copy the half-open span `start..end`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when `end` is below `start`, and
    /// `MEMORY_OUT_OF_BOUNDS` when the span leaves the memory.
    pub fn read_range(&self, ctx: impl AsContext, range: Range<u32>) -> Result<Vec<u8>> {
        if range.end < range.start {
            return Err(helpers::invalid_argument(format!(
                "memory range {}..{} ends before it starts",
                range.start, range.end
            )));
        }
        self.read(ctx, range.start, (range.end - range.start) as usize)
    }

    /// Copy `bytes` into memory at `offset`.
    pub fn write(&self, mut ctx: impl AsContextMut, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = self.check(&ctx, offset, bytes.len())?;
        self.memory.data_mut(&mut ctx)[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Move `len` bytes from `src` to `dest`; the ranges may overlap.
    pub fn copy_within(
        &self,
        mut ctx: impl AsContextMut,
        dest: u32,
        src: u32,
        len: usize,
    ) -> Result<()> {
        let from = self.check(&ctx, src, len)?;
        let to = self.check(&ctx, dest, len)?;
        self.memory.data_mut(&mut ctx).copy_within(from..from + len, to);
        Ok(())
    }

    fn read_array<const N: usize>(&self, ctx: impl AsContext, offset: u32) -> Result<[u8; N]> {
        let start = self.check(&ctx, offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.memory.data(&ctx)[start..start + N]);
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&self, ctx: impl AsContext, offset: u32) -> Result<u8> {
        Ok(self.read_array::<1>(ctx, offset)?[0])
    }

    /// Read a little-endian `i8`
    pub fn read_i8(&self, ctx: impl AsContext, offset: u32) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `u16`
    pub fn read_u16(&self, ctx: impl AsContext, offset: u32) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `i16`
    pub fn read_i16(&self, ctx: impl AsContext, offset: u32) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&self, ctx: impl AsContext, offset: u32) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&self, ctx: impl AsContext, offset: u32) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `i64`
    pub fn read_i64(&self, ctx: impl AsContext, offset: u32) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `f32`
    pub fn read_f32(&self, ctx: impl AsContext, offset: u32) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read a little-endian `f64`
    pub fn read_f64(&self, ctx: impl AsContext, offset: u32) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array(ctx, offset)?))
    }

    /// Read `count` consecutive `u32` values
    pub fn read_u32_array(&self, ctx: impl AsContext, offset: u32, count: usize) -> Result<Vec<u32>> {
        let bytes = self.read(&ctx, offset, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect())
    }

    /// Write one byte
    pub fn write_u8(&self, ctx: impl AsContextMut, offset: u32, value: u8) -> Result<()> {
        self.write(ctx, offset, &[value])
    }

    /// Write a little-endian `u32`
    pub fn write_u32(&self, ctx: impl AsContextMut, offset: u32, value: u32) -> Result<()> {
        self.write(ctx, offset, &value.to_le_bytes())
    }

    /// Write a little-endian `i32`
    pub fn write_i32(&self, ctx: impl AsContextMut, offset: u32, value: i32) -> Result<()> {
        self.write(ctx, offset, &value.to_le_bytes())
    }

    /// Read a NUL-terminated Latin-1 string, stopping after `max_bytes`.
    pub fn read_c_string(
        &self,
        ctx: impl AsContext,
        ptr: u32,
        max_bytes: Option<usize>,
    ) -> Result<String> {
        strings::decode_null_terminated(self.memory.data(&ctx), ptr as usize, max_bytes)
    }

    /// Write `text` NUL-terminated at `out_ptr` within `max_capacity` bytes.
    ///
    /// Returns the number of bytes written, excluding the terminator.
    pub fn write_c_string(
        &self,
        mut ctx: impl AsContextMut,
        text: &str,
        out_ptr: u32,
        max_capacity: i64,
    ) -> Result<usize> {
        strings::encode_into(self.memory.data_mut(&mut ctx), text, out_ptr as usize, max_capacity)
    }
}
