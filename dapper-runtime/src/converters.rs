// Dapper - dapper-runtime
// Module: Wire Conversions
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Moving values between the host and the module's wire representation.
//!
//! Each [`ConverterKind`] defines three operations: decoding a wire value
//! returned by the module ([`from_wire`]), encoding a host value for the
//! module ([`to_wire`]) and reading a value the module stored in memory
//! ([`read_value_from_pointer`]).

use dapper_error::{helpers, Result};
use log::trace;
use wasmi::{
    core::{F32, F64},
    StoreContextMut, Val,
};

use crate::{
    dyncall::{call_export, wire_f64, wire_i64},
    memory::LinearMemory,
    registry::{ConverterKind, TypeConverter},
    state::HostState,
    strings,
    value::{Destructor, HeapView, Value, ViewKind},
};

/// Sign- or zero-extend the low `size` bytes of `value`.
#[must_use]
pub fn normalize_integer(value: i64, size: u32, signed: bool) -> i64 {
    let bits = size.saturating_mul(8);
    if bits == 0 || bits >= 64 {
        return value;
    }
    let masked = value & ((1i64 << bits) - 1);
    if signed && masked & (1i64 << (bits - 1)) != 0 {
        masked - (1i64 << bits)
    } else {
        masked
    }
}

pub(crate) fn memory(ctx: &StoreContextMut<'_, HostState>) -> Result<LinearMemory> {
    ctx.data().memory.ok_or_else(helpers::memory_not_found)
}

/// Allocate `size` bytes with the module's `malloc`.
pub fn malloc(ctx: &mut StoreContextMut<'_, HostState>, size: u32) -> Result<u32> {
    let ptr = call_export(ctx, "malloc", &[Val::I32(size as i32)])?
        .ok_or_else(|| helpers::type_mismatch("malloc returned nothing"))?;
    Ok(wire_i64(&ptr)? as u32)
}

/// Release an allocation with the module's `free`.
pub fn free(ctx: &mut StoreContextMut<'_, HostState>, ptr: u32) -> Result<()> {
    call_export(ctx, "free", &[Val::I32(ptr as i32)])?;
    Ok(())
}

/// Run queued destructors in order.
pub fn run_destructors(ctx: &mut StoreContextMut<'_, HostState>, destructors: Vec<Destructor>) -> Result<()> {
    for destructor in destructors {
        match destructor {
            Destructor::Free(ptr) => free(ctx, ptr)?,
            Destructor::Call { target, argument } => {
                target.call(ctx, &[Val::I32(argument)])?;
            }
        }
    }
    Ok(())
}

fn read_std_string(ctx: &mut StoreContextMut<'_, HostState>, ptr: u32, utf8: bool) -> Result<String> {
    let memory = memory(ctx)?;
    let len = memory.read_u32(&*ctx, ptr)?;
    let payload = memory.read(&*ctx, ptr.wrapping_add(4), len as usize)?;
    let text = if utf8 {
        let bytes: Vec<u8> = payload.into_iter().filter(|byte| *byte != 0).collect();
        String::from_utf8(bytes).map_err(|err| helpers::string_encoding(err.to_string()))?
    } else {
        strings::decode_latin1(&payload)
    };
    free(ctx, ptr)?;
    Ok(text)
}

fn write_std_string(
    ctx: &mut StoreContextMut<'_, HostState>,
    value: &Value,
    utf8: bool,
    destructors: Option<&mut Vec<Destructor>>,
) -> Result<i32> {
    let payload = match value {
        Value::String(text) if utf8 => text.as_bytes().to_vec(),
        Value::String(text) => strings::encode_latin1(text)?,
        Value::Bytes(bytes) => bytes.to_vec()?,
        other => {
            return Err(helpers::type_mismatch(format!(
                "cannot pass {} as std::string",
                other.type_name()
            )));
        }
    };
    let len = payload.len() as u32;
    let base = malloc(ctx, 4 + len + 1)?;
    let memory = memory(ctx)?;
    memory.write_u32(&mut *ctx, base, len)?;
    memory.write(&mut *ctx, base + 4, &payload)?;
    memory.write_u8(&mut *ctx, base + 4 + len, 0)?;
    if let Some(destructors) = destructors {
        destructors.push(Destructor::Free(base));
    }
    Ok(base as i32)
}

/// Decode the `(size, data)` pair of a memory view handle.
pub fn decode_memory_view(
    ctx: &StoreContextMut<'_, HostState>,
    kind: ViewKind,
    handle: u32,
) -> Result<Value> {
    let memory = memory(ctx)?;
    let length = memory.read_u32(&*ctx, handle)?;
    let address = memory.read_u32(&*ctx, handle.wrapping_add(4))?;
    Ok(Value::HeapView(HeapView {
        kind,
        address,
        length,
    }))
}

/// Decode a wire value returned by the module.
///
/// Emval handles are released after decoding and `std::string` buffers are
/// freed.
pub fn from_wire(
    ctx: &mut StoreContextMut<'_, HostState>,
    converter: &TypeConverter,
    wire: &Val,
) -> Result<Value> {
    trace!("from_wire {} {wire:?}", converter.name);
    match &converter.kind {
        ConverterKind::Void => Ok(Value::Undefined),
        ConverterKind::Bool { .. } => Ok(Value::Bool(wire_i64(wire)? != 0)),
        ConverterKind::Integer { size, signed } => {
            Ok(Value::Int(normalize_integer(wire_i64(wire)?, *size, *signed)))
        }
        ConverterKind::BigInt { .. } => Ok(Value::Int(wire_i64(wire)?)),
        ConverterKind::Float { .. } => Ok(Value::Float(wire_f64(wire)?)),
        ConverterKind::StdString { utf8 } => {
            read_std_string(ctx, wire_i64(wire)? as u32, *utf8).map(Value::String)
        }
        ConverterKind::StdWString { .. } => Err(helpers::not_implemented("std::wstring marshaling")),
        ConverterKind::Emval => {
            let handle = wire_i64(wire)? as u32;
            let emval = &mut ctx.data_mut().emval;
            let value = emval.to_value(handle)?;
            emval.decref(handle)?;
            Ok(value)
        }
        ConverterKind::MemoryView { kind } => decode_memory_view(ctx, *kind, wire_i64(wire)? as u32),
        ConverterKind::ValueObject(structure) => structure.read(ctx, wire_i64(wire)? as i32),
    }
}

/// Encode a host value for the module.
///
/// Allocations made for the value are queued on `destructors` when given.
pub fn to_wire(
    ctx: &mut StoreContextMut<'_, HostState>,
    converter: &TypeConverter,
    destructors: Option<&mut Vec<Destructor>>,
    value: &Value,
) -> Result<Val> {
    let number = |value: &Value| {
        value.as_i64().ok_or_else(|| {
            helpers::type_mismatch(format!(
                "cannot convert {} to {}",
                value.type_name(),
                converter.name
            ))
        })
    };
    match &converter.kind {
        ConverterKind::Void => Ok(Val::I32(0)),
        ConverterKind::Bool {
            true_value,
            false_value,
        } => Ok(Val::I32(if value.is_truthy() { *true_value } else { *false_value })),
        ConverterKind::Integer { size, .. } if *size > 4 => Ok(Val::I64(number(value)?)),
        ConverterKind::Integer { .. } => Ok(Val::I32(number(value)? as i32)),
        ConverterKind::BigInt { .. } => Ok(Val::I64(number(value)?)),
        ConverterKind::Float { size } => {
            let x = value.as_f64().ok_or_else(|| {
                helpers::type_mismatch(format!("cannot convert {} to {}", value.type_name(), converter.name))
            })?;
            Ok(if *size == 4 { Val::F32(F32::from(x as f32)) } else { Val::F64(F64::from(x)) })
        }
        ConverterKind::StdString { utf8 } => {
            write_std_string(ctx, value, *utf8, destructors).map(Val::I32)
        }
        ConverterKind::StdWString { .. } => Err(helpers::not_implemented("std::wstring marshaling")),
        ConverterKind::Emval => Ok(Val::I32(ctx.data_mut().emval.to_handle(value.clone()) as i32)),
        ConverterKind::MemoryView { .. } => {
            Err(helpers::not_implemented("passing memory views into the module"))
        }
        ConverterKind::ValueObject(structure) => {
            structure.write(ctx, value, destructors).map(Val::I32)
        }
    }
}

/// Read a value of `converter`'s type stored at `ptr`.
pub fn read_value_from_pointer(
    ctx: &mut StoreContextMut<'_, HostState>,
    converter: &TypeConverter,
    ptr: u32,
) -> Result<Value> {
    let memory = memory(ctx)?;
    match &converter.kind {
        ConverterKind::Void => Err(helpers::type_mismatch("void has no value to read")),
        ConverterKind::Bool { .. } => Ok(Value::Bool(memory.read_u8(&*ctx, ptr)? != 0)),
        ConverterKind::Integer { size, signed } => {
            let value = match (size, signed) {
                (1, true) => i64::from(memory.read_i8(&*ctx, ptr)?),
                (1, false) => i64::from(memory.read_u8(&*ctx, ptr)?),
                (2, true) => i64::from(memory.read_i16(&*ctx, ptr)?),
                (2, false) => i64::from(memory.read_u16(&*ctx, ptr)?),
                (4, true) => i64::from(memory.read_i32(&*ctx, ptr)?),
                (4, false) => i64::from(memory.read_u32(&*ctx, ptr)?),
                (8, _) => memory.read_i64(&*ctx, ptr)?,
                _ => {
                    return Err(helpers::type_mismatch(format!(
                        "unsupported integer size {size} for {}",
                        converter.name
                    )));
                }
            };
            Ok(Value::Int(value))
        }
        ConverterKind::BigInt { .. } => Ok(Value::Int(memory.read_i64(&*ctx, ptr)?)),
        ConverterKind::Float { size: 4 } => Ok(Value::Float(f64::from(memory.read_f32(&*ctx, ptr)?))),
        ConverterKind::Float { .. } => Ok(Value::Float(memory.read_f64(&*ctx, ptr)?)),
        ConverterKind::StdWString { .. } => Err(helpers::not_implemented("std::wstring marshaling")),
        ConverterKind::MemoryView { kind } => decode_memory_view(ctx, *kind, ptr),
        ConverterKind::StdString { .. } | ConverterKind::Emval | ConverterKind::ValueObject(_) => {
            let pointee = memory.read_u32(&*ctx, ptr)?;
            from_wire(ctx, converter, &Val::I32(pointee as i32))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unsigned() {
        assert_eq!(normalize_integer(-1, 1, false), 255);
        assert_eq!(normalize_integer(-1, 2, false), 65535);
        assert_eq!(normalize_integer(-1, 4, false), 4_294_967_295);
        assert_eq!(normalize_integer(0x1ff, 1, false), 0xff);
    }

    #[test]
    fn test_normalize_signed() {
        assert_eq!(normalize_integer(255, 1, true), -1);
        assert_eq!(normalize_integer(0x7f, 1, true), 127);
        assert_eq!(normalize_integer(0x8000, 2, true), -32768);
        assert_eq!(normalize_integer(-5, 4, true), -5);
        assert_eq!(normalize_integer(i64::MIN, 8, true), i64::MIN);
    }
}
