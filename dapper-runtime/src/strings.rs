// Dapper - dapper-runtime
// Module: String Codec
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! NUL-terminated Latin-1 strings in linear memory.
//!
//! Every byte maps to the code point of the same value, so decoding never
//! fails. Encoding rejects characters above U+00FF.

use dapper_error::{helpers, Result};
use log::warn;

/// Decode bytes one code point per byte.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Encode `text` one byte per character.
///
/// # Errors
///
/// Returns `STRING_ENCODING` for a character above U+00FF.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                helpers::string_encoding(format!(
                    "character {c:?} (U+{:04X}) cannot be encoded as Latin-1",
                    u32::from(c)
                ))
            })
        })
        .collect()
}

/// Decode the string at `ptr`, stopping at the first NUL or after
/// `max_bytes` bytes, whichever comes first.
///
/// # Errors
///
/// Returns `MEMORY_OUT_OF_BOUNDS` when `ptr` lies outside `memory`, or when
/// the end of memory is reached before a terminator or the limit.
pub fn decode_null_terminated(memory: &[u8], ptr: usize, max_bytes: Option<usize>) -> Result<String> {
    let Some(tail) = memory.get(ptr..) else {
        return Err(helpers::memory_out_of_bounds(ptr as u64, 1, memory.len()));
    };
    let window = match max_bytes {
        Some(max) => &tail[..max.min(tail.len())],
        None => tail,
    };
    match window.iter().position(|&byte| byte == 0) {
        Some(end) => Ok(decode_latin1(&window[..end])),
        None if max_bytes.is_some_and(|max| max <= tail.len()) => Ok(decode_latin1(window)),
        None => Err(helpers::memory_out_of_bounds(ptr as u64, tail.len() as u64 + 1, memory.len())),
    }
}

/// Write `text` plus a NUL terminator at `out_ptr`.
///
/// At most `max_capacity - 1` characters are written so the terminator always
/// fits. A capacity of zero or less writes nothing and returns 0.
///
/// Returns the number of bytes written, excluding the terminator.
///
/// # Errors
///
/// Returns `STRING_ENCODING` for text outside Latin-1 and
/// `MEMORY_OUT_OF_BOUNDS` when the output range leaves `memory`.
pub fn encode_into(memory: &mut [u8], text: &str, out_ptr: usize, max_capacity: i64) -> Result<usize> {
    if max_capacity <= 0 {
        warn!("no room for {} characters at {out_ptr:#x}: capacity {max_capacity}", text.len());
        return Ok(0);
    }
    let bytes = encode_latin1(text)?;
    let room = usize::try_from(max_capacity - 1).unwrap_or(usize::MAX);
    let count = bytes.len().min(room);
    let end = out_ptr
        .checked_add(count + 1)
        .filter(|end| *end <= memory.len())
        .ok_or_else(|| helpers::memory_out_of_bounds(out_ptr as u64, count as u64 + 1, memory.len()))?;
    memory[out_ptr..end - 1].copy_from_slice(&bytes[..count]);
    memory[end - 1] = 0;
    Ok(count)
}
