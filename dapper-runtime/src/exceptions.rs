// Dapper - dapper-runtime
// Module: C++ Exceptions
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Turning `__cxa_throw` into a host error.
//!
//! The module allocates exceptions with a 24-byte header in front of the
//! thrown object. The host fills the header, asks the module for the type
//! name and `what()` text through `__get_exception_message` and raises
//! [`Error::module_exception`].

use dapper_error::{helpers, Error, Result};
use log::{debug, warn};
use wasmi::{StoreContextMut, Val};

use crate::{
    converters::{free, memory},
    dyncall::{call_func, stack_alloc, stack_restore, stack_save},
    state::HostState,
};

/// Size of the header in front of a thrown object
pub const EXCEPTION_HEADER_SIZE: u32 = 24;

const TYPE_OFFSET: u32 = 4;
const DESTRUCTOR_OFFSET: u32 = 8;
const CAUGHT_OFFSET: u32 = 12;
const ADJUSTED_PTR_OFFSET: u32 = 16;

/// Header of a thrown exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionInfo {
    exception_ptr: u32,
    header:        u32,
}

impl ExceptionInfo {
    /// Header of the exception object at `exception_ptr`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when there is no room for a header.
    pub fn new(exception_ptr: u32) -> Result<Self> {
        let header = exception_ptr.checked_sub(EXCEPTION_HEADER_SIZE).ok_or_else(|| {
            helpers::invalid_argument(format!("exception pointer {exception_ptr:#x} has no header"))
        })?;
        Ok(Self { exception_ptr, header })
    }

    /// Address of the thrown object
    #[must_use]
    pub fn exception_ptr(&self) -> u32 {
        self.exception_ptr
    }

    /// Record the type and destructor of a new throw.
    pub fn init(&self, ctx: &mut StoreContextMut<'_, HostState>, type_info: u32, destructor: u32) -> Result<()> {
        self.set_adjusted_ptr(ctx, 0)?;
        self.set_type(ctx, type_info)?;
        self.set_destructor(ctx, destructor)
    }

    fn write(&self, ctx: &mut StoreContextMut<'_, HostState>, offset: u32, value: u32) -> Result<()> {
        memory(ctx)?.write_u32(&mut *ctx, self.header + offset, value)
    }

    fn read(&self, ctx: &StoreContextMut<'_, HostState>, offset: u32) -> Result<u32> {
        memory(ctx)?.read_u32(ctx, self.header + offset)
    }

    /// Set the `std::type_info` pointer
    pub fn set_type(&self, ctx: &mut StoreContextMut<'_, HostState>, type_info: u32) -> Result<()> {
        self.write(ctx, TYPE_OFFSET, type_info)
    }

    /// The `std::type_info` pointer
    pub fn get_type(&self, ctx: &StoreContextMut<'_, HostState>) -> Result<u32> {
        self.read(ctx, TYPE_OFFSET)
    }

    /// Set the destructor table index
    pub fn set_destructor(&self, ctx: &mut StoreContextMut<'_, HostState>, destructor: u32) -> Result<()> {
        self.write(ctx, DESTRUCTOR_OFFSET, destructor)
    }

    /// The destructor table index
    pub fn get_destructor(&self, ctx: &StoreContextMut<'_, HostState>) -> Result<u32> {
        self.read(ctx, DESTRUCTOR_OFFSET)
    }

    /// Mark the exception caught or not
    pub fn set_caught(&self, ctx: &mut StoreContextMut<'_, HostState>, caught: bool) -> Result<()> {
        memory(ctx)?.write_u8(&mut *ctx, self.header + CAUGHT_OFFSET, u8::from(caught))
    }

    /// Whether the exception was caught
    pub fn get_caught(&self, ctx: &StoreContextMut<'_, HostState>) -> Result<bool> {
        Ok(memory(ctx)?.read_u8(ctx, self.header + CAUGHT_OFFSET)? != 0)
    }

    /// Set the adjusted object pointer
    pub fn set_adjusted_ptr(&self, ctx: &mut StoreContextMut<'_, HostState>, ptr: u32) -> Result<()> {
        self.write(ctx, ADJUSTED_PTR_OFFSET, ptr)
    }

    /// The adjusted object pointer
    pub fn get_adjusted_ptr(&self, ctx: &StoreContextMut<'_, HostState>) -> Result<u32> {
        self.read(ctx, ADJUSTED_PTR_OFFSET)
    }
}

/// Type name and message of the exception at `exception_ptr`.
///
/// Runs between a stack save and restore; both strings are capped at the
/// configured message limit.
pub fn exception_message(
    ctx: &mut StoreContextMut<'_, HostState>,
    exception_ptr: u32,
) -> Result<(String, String)> {
    let sp = stack_save(ctx)?;
    let result = extract_message(ctx, exception_ptr);
    if let Err(err) = stack_restore(ctx, sp) {
        warn!("stack restore after exception message lookup failed: {err}");
    }
    result
}

fn extract_message(ctx: &mut StoreContextMut<'_, HostState>, exception_ptr: u32) -> Result<(String, String)> {
    let limit = Some(ctx.data().config.exception_message_limit);
    let Some(get_message) = ctx.data().exports.get("__get_exception_message") else {
        let type_info = ExceptionInfo::new(exception_ptr)?.get_type(ctx)?;
        let type_name = format!("exception of type {type_info:#x}");
        return Ok((type_name.clone(), type_name));
    };
    let type_slot = stack_alloc(ctx, 4)?;
    let message_slot = stack_alloc(ctx, 4)?;
    call_func(
        ctx,
        get_message,
        "__get_exception_message",
        &[
            Val::I32(exception_ptr as i32),
            Val::I32(type_slot as i32),
            Val::I32(message_slot as i32),
        ],
    )?;
    let memory = memory(ctx)?;
    let type_addr = memory.read_u32(&*ctx, type_slot)?;
    let message_addr = memory.read_u32(&*ctx, message_slot)?;
    let type_name =
        if type_addr == 0 { String::new() } else { memory.read_c_string(&*ctx, type_addr, limit)? };
    let message = if message_addr == 0 {
        type_name.clone()
    } else {
        memory.read_c_string(&*ctx, message_addr, limit)?
    };
    if ctx.data().exports.get("free").is_some() {
        for addr in [type_addr, message_addr] {
            if addr != 0 {
                free(ctx, addr)?;
            }
        }
    }
    Ok((type_name, message))
}

fn raise(
    ctx: &mut StoreContextMut<'_, HostState>,
    exception_ptr: u32,
    type_info: u32,
    destructor: u32,
) -> Result<Error> {
    let info = ExceptionInfo::new(exception_ptr)?;
    info.init(ctx, type_info, destructor)?;
    let (type_name, message) = exception_message(ctx, exception_ptr)?;
    debug!("module threw {type_name}: {message}");
    Ok(Error::module_exception(type_name, message))
}

/// Handle `__cxa_throw(ptr, type, destructor)`.
///
/// Always returns an error: the resulting [`Error::module_exception`], or
/// whatever went wrong while building it.
pub fn cxa_throw(
    ctx: &mut StoreContextMut<'_, HostState>,
    exception_ptr: u32,
    type_info: u32,
    destructor: u32,
) -> Error {
    match raise(ctx, exception_ptr, type_info, destructor) {
        Ok(error) | Err(error) => error,
    }
}
