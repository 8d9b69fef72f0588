// Dapper - dapper-runtime
// Module: Emval Imports
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! `_emval_*` imports: the module's view of host objects.
//!
//! Through these the module looks up globals such as `readData`, reads
//! properties, builds typed arrays and calls host functions. Every object it
//! holds is an emval handle.

use dapper_error::{helpers, Result};
use dapper_foundation::{Int32View, Uint8View, ViewProperty};
use log::trace;
use wasmi::{core::F64, StoreContextMut, Val};

use crate::{
    converters::{self, memory, read_value_from_pointer, to_wire},
    dyncall::{arg_i32, arg_u32},
    imports::env::{emit_output, STDERR_FD, STDOUT_FD},
    registry::TypeConverter,
    state::HostState,
    strings,
    value::{HeapView, HostFunction, Value, ViewKind},
};

/// Most arguments a method caller may forward
pub const MAX_METHOD_CALLER_ARITY: usize = 3;

/// Argument and return converters fixed by `_emval_get_method_caller`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCaller {
    /// Converter for the result
    pub return_type: TypeConverter,
    /// Converters for the arguments
    pub arg_types:   Vec<TypeConverter>,
    /// Caller kind as passed by the module
    pub kind:        i32,
}

fn handle_value(ctx: &StoreContextMut<'_, HostState>, handle: u32) -> Result<Value> {
    ctx.data().emval.to_value(handle)
}

fn new_handle(ctx: &mut StoreContextMut<'_, HostState>, value: Value) -> Option<Val> {
    Some(Val::I32(ctx.data_mut().emval.to_handle(value) as i32))
}

fn read_name(ctx: &StoreContextMut<'_, HostState>, ptr: u32) -> Result<String> {
    memory(ctx)?.read_c_string(ctx, ptr, None)
}

/// Value of the global `name`
pub fn global_value(ctx: &StoreContextMut<'_, HostState>, name: &str) -> Result<Value> {
    if let Some(function) = HostFunction::global(name) {
        return Ok(Value::Function(function));
    }
    match name {
        "HEAPU8" => Ok(Value::HeapView(ctx.data().heap_u8()?)),
        "globalThis" => Ok(Value::Global),
        _ => Err(helpers::invalid_argument(format!("global {name} is not defined"))),
    }
}

/// Snapshot the bytes of a byte-like value.
pub fn bytes_of(ctx: &StoreContextMut<'_, HostState>, value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(view) => view.to_vec(),
        Value::Words(view) => Ok(view.to_vec()?.iter().flat_map(|word| word.to_le_bytes()).collect()),
        Value::HeapView(view) => memory(ctx)?.read(ctx, view.address, view.byte_len() as usize),
        Value::String(text) => strings::encode_latin1(text),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .map(|byte| byte as u8)
                    .ok_or_else(|| helpers::type_mismatch(format!("{} is not a byte", item.type_name())))
            })
            .collect(),
        other => Err(helpers::type_mismatch(format!("{} has no bytes", other.type_name()))),
    }
}

fn text_of(ctx: &StoreContextMut<'_, HostState>, value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Bytes(_) | Value::HeapView(_) => Ok(strings::decode_latin1(&bytes_of(ctx, value)?)),
        other => Ok(other.to_string()),
    }
}

pub(crate) fn read_heap_element(ctx: &StoreContextMut<'_, HostState>, view: &HeapView, index: i64) -> Result<Value> {
    if index < 0 || index >= i64::from(view.length) {
        return Err(helpers::index_out_of_range(index, view.length as usize));
    }
    let memory = memory(ctx)?;
    let address = view.address.wrapping_add(index as u32 * view.kind.element_size());
    Ok(match view.kind {
        ViewKind::Int8 => Value::Int(memory.read_i8(ctx, address)?.into()),
        ViewKind::Uint8 => Value::Int(memory.read_u8(ctx, address)?.into()),
        ViewKind::Int16 => Value::Int(memory.read_i16(ctx, address)?.into()),
        ViewKind::Uint16 => Value::Int(memory.read_u16(ctx, address)?.into()),
        ViewKind::Int32 => Value::Int(memory.read_i32(ctx, address)?.into()),
        ViewKind::Uint32 => Value::Int(memory.read_u32(ctx, address)?.into()),
        ViewKind::Float32 => Value::Float(memory.read_f32(ctx, address)?.into()),
        ViewKind::Float64 => Value::Float(memory.read_f64(ctx, address)?),
        ViewKind::BigInt64 | ViewKind::BigUint64 => Value::Int(memory.read_i64(ctx, address)?),
    })
}

fn view_property(target: &Value, kind: ViewKind, name: &str) -> Option<Value> {
    match ViewProperty::from_name(name)? {
        ViewProperty::Constructor => Some(Value::Function(HostFunction::ViewConstructor(kind))),
        ViewProperty::Set => Some(Value::Function(HostFunction::ViewSet(Box::new(target.clone())))),
        ViewProperty::Length | ViewProperty::Buffer | ViewProperty::Ptr => None,
    }
}

/// Property `key` of `target`.
///
/// Unknown properties read as `undefined`; reading from `undefined` or
/// `null` fails.
pub fn property(ctx: &StoreContextMut<'_, HostState>, target: &Value, key: &Value) -> Result<Value> {
    let name = match key {
        Value::String(name) => name.clone(),
        Value::Int(index) => index.to_string(),
        other => other.to_string(),
    };
    let index = match key {
        Value::String(name) => name.parse::<i64>().ok(),
        other => other.as_i64(),
    };
    let value = match target {
        Value::Undefined | Value::Null => {
            return Err(helpers::type_mismatch(format!(
                "cannot read property {name} of {}",
                target.type_name()
            )));
        }
        Value::Object(fields) => fields.get(&name).cloned(),
        Value::Global => global_value(ctx, &name).ok(),
        Value::Array(items) => match index {
            Some(index) => usize::try_from(index).ok().and_then(|index| items.get(index).cloned()),
            None if name == "length" => Some(Value::Int(items.len() as i64)),
            None => None,
        },
        Value::String(text) if name == "length" => Some(Value::Int(text.chars().count() as i64)),
        Value::Bytes(view) => match (index, ViewProperty::from_name(&name)) {
            (Some(index), _) => Some(Value::Int(view.get(index)?.into())),
            (None, Some(ViewProperty::Length)) => Some(Value::Int(view.len() as i64)),
            (None, Some(ViewProperty::Buffer)) => {
                Some(Value::Bytes(Uint8View::new(view.buffer(), 0, None)?))
            }
            (None, Some(ViewProperty::Ptr)) => Some(Value::Int(view.address().into())),
            (None, _) => view_property(target, ViewKind::Uint8, &name),
        },
        Value::Words(view) => match (index, ViewProperty::from_name(&name)) {
            (Some(index), _) => Some(Value::Int(view.get(index)?.into())),
            (None, Some(ViewProperty::Length)) => Some(Value::Int(view.len() as i64)),
            (None, Some(ViewProperty::Buffer)) => {
                Some(Value::Bytes(Uint8View::new(view.buffer(), 0, None)?))
            }
            (None, Some(ViewProperty::Ptr)) => Some(Value::Int(view.address().into())),
            (None, _) => view_property(target, ViewKind::Int32, &name),
        },
        Value::HeapView(view) => match (index, ViewProperty::from_name(&name)) {
            (Some(index), _) => Some(read_heap_element(ctx, view, index)?),
            (None, Some(ViewProperty::Length)) => Some(Value::Int(view.length.into())),
            (None, Some(ViewProperty::Buffer)) => Some(Value::HeapView(ctx.data().heap_u8()?)),
            (None, Some(ViewProperty::Ptr)) => Some(Value::Int(view.address.into())),
            (None, _) => view_property(target, view.kind, &name),
        },
        _ => None,
    };
    Ok(value.unwrap_or(Value::Undefined))
}

fn optional_i64(args: &[Value], index: usize) -> Option<i64> {
    args.get(index).filter(|arg| !matches!(arg, Value::Undefined)).and_then(Value::as_i64)
}

/// `new <kind>(source, offset, length)`.
fn construct_view(ctx: &StoreContextMut<'_, HostState>, kind: ViewKind, args: &[Value]) -> Result<Value> {
    let source = args.first().cloned().unwrap_or_default();
    let offset = optional_i64(args, 1).unwrap_or(0);
    let length = optional_i64(args, 2);
    match (&source, kind) {
        (Value::HeapView(heap), _) => {
            let element = i64::from(kind.element_size());
            let total = heap.byte_len() as i64;
            if offset < 0 || offset > total || offset % element != 0 {
                return Err(helpers::invalid_argument(format!(
                    "offset {offset} is not a valid start for {}",
                    kind.as_str()
                )));
            }
            let length = length.unwrap_or((total - offset) / element);
            if length < 0 || offset + length * element > total {
                return Err(helpers::invalid_argument(format!(
                    "{} of length {length} at {offset} exceeds the buffer",
                    kind.as_str()
                )));
            }
            Ok(Value::HeapView(HeapView {
                kind,
                address: heap.address.wrapping_add(offset as u32),
                length: length as u32,
            }))
        }
        (Value::Bytes(view), ViewKind::Uint8) => Ok(Value::Bytes(view.subview(offset, length)?)),
        (Value::Bytes(view), ViewKind::Int32) => Ok(Value::Words(Int32View::from_bytes(view, offset, length)?)),
        (Value::Words(view), ViewKind::Uint8) => {
            Ok(Value::Bytes(Uint8View::new(view.buffer(), offset, length)?))
        }
        (Value::Words(view), ViewKind::Int32) => Ok(Value::Words(Int32View::new(view.buffer(), offset, length)?)),
        (Value::Int(len), ViewKind::Uint8) if *len >= 0 => Ok(Value::Bytes(Uint8View::zeroed(*len as usize))),
        (Value::Int(len), ViewKind::Int32) if *len >= 0 => {
            Ok(Value::Words(Int32View::from_values(&vec![0; *len as usize])))
        }
        (Value::Array(_) | Value::String(_), ViewKind::Uint8) => {
            Ok(Value::Bytes(Uint8View::from_vec(bytes_of(ctx, &source)?)))
        }
        (Value::Array(items), ViewKind::Int32) => {
            let words = items
                .iter()
                .map(|item| item.as_i64().map(|word| word as i32))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| helpers::type_mismatch("Int32Array elements must be numbers"))?;
            Ok(Value::Words(Int32View::from_values(&words)))
        }
        _ => Err(helpers::not_implemented(&format!(
            "constructing {} from {}",
            kind.as_str(),
            source.type_name()
        ))),
    }
}

/// `target.set(source)`; returns the target's length.
fn view_set(ctx: &mut StoreContextMut<'_, HostState>, target: &Value, source: &Value) -> Result<Value> {
    match (target, source) {
        (Value::Words(view), Value::Words(words)) => Ok(Value::Int(view.set(words)? as i64)),
        (Value::Bytes(view), _) => {
            view.set_bytes(&bytes_of(ctx, source)?)?;
            Ok(Value::Int(view.len() as i64))
        }
        (Value::Words(view), _) => {
            let bytes = bytes_of(ctx, source)?;
            let words = Int32View::from_bytes(&Uint8View::from_vec(bytes), 0, None)?;
            Ok(Value::Int(view.set(&words)? as i64))
        }
        (Value::HeapView(view), _) => {
            let bytes = bytes_of(ctx, source)?;
            let count = bytes.len().min(view.byte_len() as usize);
            memory(ctx)?.write(&mut *ctx, view.address, &bytes[..count])?;
            Ok(Value::Int(view.length.into()))
        }
        _ => Err(helpers::type_mismatch(format!("{} has no set", target.type_name()))),
    }
}

/// Call a host function.
pub fn call_host_function(
    ctx: &mut StoreContextMut<'_, HostState>,
    function: &HostFunction,
    args: &[Value],
) -> Result<Value> {
    trace!("calling host function {}", function.name());
    let first = args.first().cloned().unwrap_or_default();
    match function {
        HostFunction::ReadData => Ok(Value::Bytes(ctx.data().callbacks.read_data()?)),
        HostFunction::WriteData => {
            let bytes = bytes_of(ctx, &first)?;
            ctx.data().callbacks.write_data(&Uint8View::from_vec(bytes))?;
            Ok(Value::Undefined)
        }
        HostFunction::Stdout => {
            emit_output(ctx, STDOUT_FD, &text_of(ctx, &first)?)?;
            Ok(Value::Undefined)
        }
        HostFunction::Stderr => {
            emit_output(ctx, STDERR_FD, &text_of(ctx, &first)?)?;
            Ok(Value::Undefined)
        }
        HostFunction::ViewConstructor(kind) => construct_view(ctx, *kind, args),
        HostFunction::ViewSet(target) => view_set(ctx, target, &first),
    }
}

/// Call `callee` with `args`.
///
/// # Errors
///
/// Returns `TYPE_MISMATCH` when `callee` is not callable.
pub fn call_value(ctx: &mut StoreContextMut<'_, HostState>, callee: &Value, args: &[Value]) -> Result<Value> {
    match callee {
        Value::Function(function) => call_host_function(ctx, function, args),
        other => Err(helpers::type_mismatch(format!("{other} is not a function"))),
    }
}

fn method_caller(ctx: &StoreContextMut<'_, HostState>, caller_id: i32) -> Result<MethodCaller> {
    usize::try_from(caller_id)
        .ok()
        .and_then(|index| ctx.data().method_callers.get(index).cloned())
        .ok_or_else(|| {
            dapper_error::Error::new(
                dapper_error::ErrorCategory::Call,
                dapper_error::codes::INVALID_METHOD_CALLER,
                format!("no method caller with id {caller_id}"),
            )
        })
}

fn read_caller_args(
    ctx: &mut StoreContextMut<'_, HostState>,
    caller: &MethodCaller,
    args_ptr: u32,
) -> Result<Vec<Value>> {
    let mut cursor = args_ptr;
    let mut args = Vec::with_capacity(caller.arg_types.len());
    for converter in &caller.arg_types {
        args.push(read_value_from_pointer(ctx, converter, cursor)?);
        cursor = cursor.wrapping_add(converter.arg_pack_advance);
    }
    Ok(args)
}

/// Encode a result for the module, publishing its destructors at
/// `destructors_ref`. Every result travels as a double.
fn return_value(
    ctx: &mut StoreContextMut<'_, HostState>,
    return_type: &TypeConverter,
    destructors_ref: u32,
    value: &Value,
) -> Result<Option<Val>> {
    let mut destructors = Vec::new();
    let wire = to_wire(ctx, return_type, Some(&mut destructors), value)?;
    if !destructors.is_empty() && destructors_ref != 0 {
        let handle = ctx.data_mut().emval.to_handle(Value::Destructors(destructors));
        memory(ctx)?.write_u32(&mut *ctx, destructors_ref, handle)?;
    }
    Ok(Some(Val::F64(F64::from(crate::dyncall::wire_f64(&wire)?))))
}

/// `_emval_incref(handle)`
pub fn incref(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    ctx.data_mut().emval.incref(arg_u32(params, 0)?)?;
    Ok(None)
}

/// `_emval_decref(handle)`
pub fn decref(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    ctx.data_mut().emval.decref(arg_u32(params, 0)?)?;
    Ok(None)
}

/// `_emval_take_value(type, arg_ptr)`
pub fn take_value(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let converter = ctx.data().registry.require(arg_u32(params, 0)?)?.clone();
    let value = read_value_from_pointer(ctx, &converter, arg_u32(params, 1)?)?;
    Ok(new_handle(ctx, value))
}

/// `_emval_new_cstring(ptr)`
pub fn new_cstring(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let text = read_name(ctx, arg_u32(params, 0)?)?;
    Ok(new_handle(ctx, Value::String(text)))
}

/// `_emval_get_global(name_ptr)`; a null name yields the global object
pub fn get_global(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let value = match arg_u32(params, 0)? {
        0 => Value::Global,
        ptr => {
            let name = read_name(ctx, ptr)?;
            global_value(ctx, &name)?
        }
    };
    Ok(new_handle(ctx, value))
}

/// `_emval_get_module_property(name_ptr)`; only `HEAPU8` is provided
pub fn get_module_property(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 0)?)?;
    if name != "HEAPU8" {
        return Err(helpers::not_implemented(&format!("module property {name}")));
    }
    let heap = ctx.data().heap_u8()?;
    Ok(new_handle(ctx, Value::HeapView(heap)))
}

/// `_emval_get_property(handle, key)`
pub fn get_property(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let target = handle_value(ctx, arg_u32(params, 0)?)?;
    let key = handle_value(ctx, arg_u32(params, 1)?)?;
    let value = property(ctx, &target, &key)?;
    Ok(new_handle(ctx, value))
}

/// `_emval_get_method_caller(arg_count, arg_types, kind)`
///
/// `arg_types` starts with the return type. Returns the caller id.
pub fn get_method_caller(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let count = arg_i32(params, 0)?;
    if count < 1 {
        return Err(helpers::invalid_argument(format!("method caller needs a return type, got {count} types")));
    }
    let arity = count as usize - 1;
    if arity > MAX_METHOD_CALLER_ARITY {
        return Err(helpers::unsupported_arity(arity, MAX_METHOD_CALLER_ARITY));
    }
    let types = memory(ctx)?.read_u32_array(&*ctx, arg_u32(params, 1)?, count as usize)?;
    let kind = if params.len() > 2 { arg_i32(params, 2)? } else { 0 };
    let state = ctx.data_mut();
    let mut converters = types
        .iter()
        .map(|raw_type| state.registry.require(*raw_type).cloned())
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let Some(return_type) = converters.next() else {
        return Err(helpers::invalid_argument("method caller without return type"));
    };
    state.method_callers.push(MethodCaller {
        return_type,
        arg_types: converters.collect(),
        kind,
    });
    Ok(Some(Val::I32(state.method_callers.len() as i32 - 1)))
}

/// `_emval_call(caller, handle, destructors_ref, args)`
pub fn call(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let caller = method_caller(ctx, arg_i32(params, 0)?)?;
    let callee = handle_value(ctx, arg_u32(params, 1)?)?;
    let args = read_caller_args(ctx, &caller, arg_u32(params, 3)?)?;
    let result = call_value(ctx, &callee, &args)?;
    return_value(ctx, &caller.return_type, arg_u32(params, 2)?, &result)
}

/// `_emval_call_method(caller, handle, name_ptr, destructors_ref, args)`
pub fn call_method(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let caller = method_caller(ctx, arg_i32(params, 0)?)?;
    let target = handle_value(ctx, arg_u32(params, 1)?)?;
    let name = read_name(ctx, arg_u32(params, 2)?)?;
    let method = property(ctx, &target, &Value::String(name))?;
    let args = read_caller_args(ctx, &caller, arg_u32(params, 4)?)?;
    let result = call_value(ctx, &method, &args)?;
    return_value(ctx, &caller.return_type, arg_u32(params, 3)?, &result)
}

/// `_emval_as(handle, return_type, destructors_ref)`
pub fn as_type(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let value = handle_value(ctx, arg_u32(params, 0)?)?;
    let return_type = ctx.data().registry.require(arg_u32(params, 1)?)?.clone();
    return_value(ctx, &return_type, arg_u32(params, 2)?, &value)
}

/// `_emval_await(handle)`: values are never pending, so the handle is returned
pub fn await_value(_ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    Ok(Some(Val::I32(arg_i32(params, 0)?)))
}

/// `_emval_run_destructors(handle)`
pub fn run_destructors(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let handle = arg_u32(params, 0)?;
    if let Value::Destructors(destructors) = handle_value(ctx, handle)? {
        converters::run_destructors(ctx, destructors)?;
    }
    ctx.data_mut().emval.decref(handle)?;
    Ok(None)
}
