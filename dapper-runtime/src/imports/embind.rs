// Dapper - dapper-runtime
// Module: Embind Registration Imports
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! `_embind_register_*` imports.
//!
//! The module's static constructors call these to describe its types and
//! functions. Primitive types register immediately; value objects and
//! functions wait in the type registry until their dependencies exist.

use std::{collections::VecDeque, sync::Arc};

use dapper_error::{helpers, Result};
use log::debug;
use wasmi::{StoreContextMut, Val};

use crate::{
    converters::memory,
    dyncall::{arg_i32, arg_i64, arg_u32, DynCallTarget},
    functions::{exposed_name, FunctionBinding, FunctionEntry},
    registry::{ConverterKind, RegisterOptions, Resolved, TypeConverter},
    state::{HostState, PendingAction},
    structs::{FieldRegistration, StructRegistration},
    value::ViewKind,
};

fn read_name(ctx: &StoreContextMut<'_, HostState>, ptr: u32) -> Result<String> {
    memory(ctx)?.read_c_string(ctx, ptr, None)
}

fn read_target(ctx: &StoreContextMut<'_, HostState>, signature_ptr: u32, index: i32) -> Result<DynCallTarget> {
    DynCallTarget::parse(&read_name(ctx, signature_ptr)?, index)
}

/// Run completions handed back by the registry until none are left.
///
/// Registering the converters a completion produces may resolve further
/// entries; those are processed in the order they become ready.
pub(crate) fn complete_registrations(
    state: &mut HostState,
    ready: Vec<Resolved<PendingAction>>,
) -> Result<()> {
    let mut queue: VecDeque<_> = ready.into();
    while let Some(Resolved {
        own_types,
        converters,
        action,
    }) = queue.pop_front()
    {
        let produced = match action {
            PendingAction::FinalizeStruct(registration) => {
                let name = registration.name.clone();
                let converter = registration.finalize(&converters)?;
                vec![TypeConverter::new(name, ConverterKind::ValueObject(Arc::new(converter)))]
            }
            PendingAction::BindFunction(binding) => {
                let function = binding.bind(converters)?;
                state.functions.insert(function.name.clone(), FunctionEntry::Bound(Arc::new(function)));
                Vec::new()
            }
        };
        queue.extend(state.registry.register_resolved(&own_types, produced)?);
    }
    Ok(())
}

fn register(
    ctx: &mut StoreContextMut<'_, HostState>,
    raw_type: i32,
    converter: TypeConverter,
    options: RegisterOptions,
) -> Result<Option<Val>> {
    let state = ctx.data_mut();
    let ready = state.registry.register_type(raw_type, converter, options)?;
    complete_registrations(state, ready)?;
    Ok(None)
}

/// `_embind_register_void(raw_type, name)`
pub fn register_void(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let converter = TypeConverter::new(name, ConverterKind::Void);
    register(ctx, arg_i32(params, 0)?, converter, RegisterOptions::default())
}

/// `_embind_register_bool(raw_type, name, [size,] true_value, false_value)`
pub fn register_bool(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let first = if params.len() >= 5 { 3 } else { 2 };
    let kind = ConverterKind::Bool {
        true_value:  arg_i32(params, first)?,
        false_value: arg_i32(params, first + 1)?,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_integer(raw_type, name, size, min_range, max_range)`
///
/// A type is signed when its minimum is non-zero.
pub fn register_integer(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let kind = ConverterKind::Integer {
        size:   arg_u32(params, 2)?,
        signed: arg_i64(params, 3)? != 0,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_bigint(raw_type, name, size, min_range, max_range)`
pub fn register_bigint(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let kind = ConverterKind::BigInt {
        size:   arg_u32(params, 2)?,
        signed: arg_i64(params, 3)? != 0,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_float(raw_type, name, size)`
pub fn register_float(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let kind = ConverterKind::Float {
        size: arg_u32(params, 2)?,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_std_string(raw_type, name)`
///
/// `std::string` carries UTF-8; other names carry raw bytes.
pub fn register_std_string(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let kind = ConverterKind::StdString {
        utf8: name == "std::string",
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_std_wstring(raw_type, char_size, name)`
pub fn register_std_wstring(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = read_name(ctx, arg_u32(params, 2)?)?;
    let kind = ConverterKind::StdWString {
        char_size: arg_u32(params, 1)?,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, kind), RegisterOptions::default())
}

/// `_embind_register_emval(raw_type)`
pub fn register_emval(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let converter = TypeConverter::new("emscripten::val", ConverterKind::Emval);
    register(ctx, arg_i32(params, 0)?, converter, RegisterOptions::default())
}

/// `_embind_register_memory_view(raw_type, data_type_index, name)`
pub fn register_memory_view(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let index = arg_u32(params, 1)?;
    let kind = ViewKind::from_index(index)
        .ok_or_else(|| helpers::invalid_argument(format!("unknown memory view type index {index}")))?;
    let name = read_name(ctx, arg_u32(params, 2)?)?;
    let options = RegisterOptions {
        ignore_duplicate_registrations: true,
    };
    register(ctx, arg_i32(params, 0)?, TypeConverter::new(name, ConverterKind::MemoryView { kind }), options)
}

/// `_embind_register_value_object(raw_type, name, constructor_signature,
/// constructor, destructor_signature, destructor)`
pub fn register_value_object(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let raw_type = arg_u32(params, 0)?;
    let name = read_name(ctx, arg_u32(params, 1)?)?;
    let constructor = read_target(ctx, arg_u32(params, 2)?, arg_i32(params, 3)?)?;
    let destructor = read_target(ctx, arg_u32(params, 4)?, arg_i32(params, 5)?)?;
    debug!("value object {name} ({raw_type}) opened");
    ctx.data_mut()
        .value_objects
        .insert(raw_type, StructRegistration::new(name, constructor, destructor));
    Ok(None)
}

/// `_embind_register_value_object_field(struct_type, field_name,
/// getter_return_type, getter_signature, getter, getter_context,
/// setter_argument_type, setter_signature, setter, setter_context)`
pub fn register_value_object_field(
    ctx: &mut StoreContextMut<'_, HostState>,
    params: &[Val],
) -> Result<Option<Val>> {
    let struct_type = arg_u32(params, 0)?;
    let field = FieldRegistration {
        name:                 read_name(ctx, arg_u32(params, 1)?)?,
        getter_return_type:   arg_u32(params, 2)?,
        getter:               read_target(ctx, arg_u32(params, 3)?, arg_i32(params, 4)?)?,
        getter_context:       arg_i32(params, 5)?,
        setter_argument_type: arg_u32(params, 6)?,
        setter:               read_target(ctx, arg_u32(params, 7)?, arg_i32(params, 8)?)?,
        setter_context:       arg_i32(params, 9)?,
    };
    ctx.data_mut()
        .value_objects
        .get_mut(&struct_type)
        .ok_or_else(|| helpers::unregistered_type(struct_type))?
        .fields
        .push(field);
    Ok(None)
}

/// `_embind_finalize_value_object(struct_type)`
pub fn finalize_value_object(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let struct_type = arg_u32(params, 0)?;
    let state = ctx.data_mut();
    let registration = state
        .value_objects
        .remove(&struct_type)
        .ok_or_else(|| helpers::unregistered_type(struct_type))?;
    let dependencies = registration.dependency_types();
    let ready = state.registry.when_dependent_types_are_resolved(
        vec![struct_type],
        dependencies,
        PendingAction::FinalizeStruct(registration),
    );
    complete_registrations(state, ready.into_iter().collect())?;
    Ok(None)
}

/// `_embind_register_function(name, arg_count, arg_types, signature, invoker,
/// function, is_async)`
///
/// `arg_types` lists the return type followed by the argument types.
pub fn register_function(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let name = exposed_name(&read_name(ctx, arg_u32(params, 0)?)?)?;
    let arg_count = arg_u32(params, 1)? as usize;
    let types = memory(ctx)?.read_u32_array(&*ctx, arg_u32(params, 2)?, arg_count)?;
    let invoker = read_target(ctx, arg_u32(params, 3)?, arg_i32(params, 4)?)?;
    let binding = FunctionBinding {
        name: name.clone(),
        invoker,
        function_index: arg_i32(params, 5)?,
        is_async: params.len() > 6 && arg_i32(params, 6)? != 0,
    };
    debug!("function {name} registered with types {types:?}");
    let state = ctx.data_mut();
    state.functions.insert(name, FunctionEntry::Unbound { types: types.clone() });
    let ready =
        state.registry.when_dependent_types_are_resolved(Vec::new(), types, PendingAction::BindFunction(binding));
    complete_registrations(state, ready.into_iter().collect())?;
    Ok(None)
}
