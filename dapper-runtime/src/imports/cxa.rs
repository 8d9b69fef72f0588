// Dapper - dapper-runtime
// Module: C++ ABI Imports
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! C++ exception imports.
//!
//! Throwing is supported and surfaces as a module exception error. Catching
//! inside the module is not: the catch-side imports fail with
//! `NOT_IMPLEMENTED`.

use dapper_error::{helpers, Result};
use wasmi::{StoreContextMut, Val};

use crate::{dyncall::arg_u32, exceptions, state::HostState};

/// `__cxa_throw(ptr, type, destructor)`
pub fn cxa_throw(ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
    let ptr = arg_u32(params, 0)?;
    let type_info = arg_u32(params, 1)?;
    let destructor = arg_u32(params, 2)?;
    Err(exceptions::cxa_throw(ctx, ptr, type_info, destructor))
}

macro_rules! unsupported_imports {
    ($($(#[$doc:meta])* $handler:ident => $name:literal,)*) => {
        $(
            $(#[$doc])*
            pub fn $handler(
                _ctx: &mut StoreContextMut<'_, HostState>,
                _params: &[Val],
            ) -> Result<Option<Val>> {
                Err(helpers::not_implemented($name))
            }
        )*
    };
}

unsupported_imports! {
    /// `__cxa_begin_catch`
    cxa_begin_catch => "__cxa_begin_catch",
    /// `__cxa_end_catch`
    cxa_end_catch => "__cxa_end_catch",
    /// `__cxa_rethrow`
    cxa_rethrow => "__cxa_rethrow",
    /// `__cxa_find_matching_catch_2`
    cxa_find_matching_catch_2 => "__cxa_find_matching_catch_2",
    /// `__cxa_find_matching_catch_3`
    cxa_find_matching_catch_3 => "__cxa_find_matching_catch_3",
    /// `__cxa_uncaught_exceptions`
    cxa_uncaught_exceptions => "__cxa_uncaught_exceptions",
    /// `__resumeException`
    resume_exception => "__resumeException",
}
