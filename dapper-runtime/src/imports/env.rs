// Dapper - dapper-runtime
// Module: Emscripten Environment Imports
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! libc and WASI imports: console output, environment, sleeping and memory.

use std::{thread, time::Duration};

use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
use dapper_logging::{LogLevel, LogOperation, LoggingExt};
use log::{debug, warn};
use wasmi::{StoreContextMut, Val};

use crate::{
    converters::memory,
    dyncall::{arg_i32, arg_u32},
    state::HostState,
    strings,
};

/// Standard output descriptor
pub const STDOUT_FD: i32 = 1;
/// Standard error descriptor
pub const STDERR_FD: i32 = 2;

const WASI_SUCCESS: i32 = 0;

/// Deliver module console text to the callbacks and any log handler.
pub(crate) fn emit_output(ctx: &StoreContextMut<'_, HostState>, fd: i32, text: &str) -> Result<()> {
    let callbacks = &ctx.data().callbacks;
    let level = match fd {
        STDOUT_FD => {
            callbacks.stdout(text);
            LogLevel::Info
        }
        STDERR_FD => {
            callbacks.stderr(text);
            LogLevel::Error
        }
        _ => return Err(helpers::unsupported_descriptor(fd)),
    };
    if callbacks.has_log_handler() {
        callbacks.handle_log(LogOperation::module_output(level, text));
    }
    Ok(())
}

/// `abort()`
pub fn abort(_ctx: &mut StoreContextMut<'_, HostState>, _params: &[Val]) -> Result<Option<Val>> {
    Err(Error::new(ErrorCategory::Module, codes::MODULE_ABORT, "native code called abort()"))
}

/// `emscripten_sleep(ms)`
pub fn emscripten_sleep(_ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let millis = arg_i32(params, 0)?.max(0);
    thread::sleep(Duration::from_millis(millis as u64));
    Ok(None)
}

/// `environ_get(environ, environ_buf)`: the module sees no environment
pub fn environ_get(_ctx: &mut StoreContextMut<'_, HostState>, _params: &[Val]) -> Result<Option<Val>> {
    Ok(Some(Val::I32(WASI_SUCCESS)))
}

/// `environ_sizes_get(count_ptr, size_ptr)`: zero entries, zero bytes
pub fn environ_sizes_get(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let memory = memory(ctx)?;
    memory.write_u32(&mut *ctx, arg_u32(params, 0)?, 0)?;
    memory.write_u32(&mut *ctx, arg_u32(params, 1)?, 0)?;
    Ok(Some(Val::I32(WASI_SUCCESS)))
}

/// `fd_write(fd, iov, iovcnt, pnum)` for stdout and stderr.
///
/// Gathers every iovec, emits the bytes once as Latin-1 text and stores the
/// byte count at `pnum`.
pub fn fd_write(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let fd = arg_i32(params, 0)?;
    if fd != STDOUT_FD && fd != STDERR_FD {
        return Err(helpers::unsupported_descriptor(fd));
    }
    let iov = arg_u32(params, 1)?;
    let iovcnt = arg_u32(params, 2)?;
    let pnum = arg_u32(params, 3)?;
    let memory = memory(ctx)?;
    let mut bytes = Vec::new();
    for index in 0..iovcnt {
        let entry = iov.wrapping_add(index * 8);
        let ptr = memory.read_u32(&*ctx, entry)?;
        let len = memory.read_u32(&*ctx, entry.wrapping_add(4))?;
        bytes.extend(memory.read(&*ctx, ptr, len as usize)?);
    }
    emit_output(ctx, fd, &strings::decode_latin1(&bytes))?;
    memory.write_u32(&mut *ctx, pnum, bytes.len() as u32)?;
    Ok(Some(Val::I32(WASI_SUCCESS)))
}

/// `fd_seek`: console descriptors do not seek; reported as success
pub fn fd_seek(_ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    debug!("fd_seek({}) ignored", arg_i32(params, 0)?);
    Ok(Some(Val::I32(WASI_SUCCESS)))
}

/// `fd_close`: ignored
pub fn fd_close(_ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    warn!("fd_close({}) ignored", arg_i32(params, 0)?);
    Ok(Some(Val::I32(WASI_SUCCESS)))
}

/// `emscripten_resize_heap(requested)`: linear memory never grows
pub fn emscripten_resize_heap(
    _ctx: &mut StoreContextMut<'_, HostState>,
    params: &[Val],
) -> Result<Option<Val>> {
    Err(Error::new(
        ErrorCategory::Memory,
        codes::MEMORY_GROWTH_UNSUPPORTED,
        format!("module requested {} bytes of memory; growth is not supported", arg_u32(params, 0)?),
    ))
}

/// `emscripten_memcpy_js(dest, src, num)`
pub fn emscripten_memcpy_js(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let dest = arg_u32(params, 0)?;
    let src = arg_u32(params, 1)?;
    let num = arg_u32(params, 2)?;
    memory(ctx)?.copy_within(&mut *ctx, dest, src, num as usize)?;
    Ok(None)
}

/// `strftime_l`
pub fn strftime_l(_ctx: &mut StoreContextMut<'_, HostState>, _params: &[Val]) -> Result<Option<Val>> {
    Err(helpers::not_implemented("strftime_l"))
}

/// `__assert_fail(condition, filename, line, func)`
pub fn assert_fail(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let memory = memory(ctx)?;
    let text = |index: usize| -> Result<String> {
        match arg_u32(params, index)? {
            0 => Ok("unknown".to_string()),
            ptr => memory.read_c_string(&*ctx, ptr, None),
        }
    };
    let message = format!(
        "Assertion failed: {}, at: [{}, {}, {}]",
        text(0)?,
        text(1)?,
        arg_i32(params, 2)?,
        text(3)?
    );
    Err(Error::new(ErrorCategory::Module, codes::ASSERTION_FAILED, message))
}
