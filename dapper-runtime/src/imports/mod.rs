// Dapper - dapper-runtime
// Module: Import Dictionary
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host implementations of the module's imports.
//!
//! Imports are resolved by name alone; the import module (`env`,
//! `wasi_snapshot_preview1`) is not consulted. An import the dictionary does
//! not know fails binding with `UNRESOLVED_IMPORT`.

pub mod cxa;
pub mod embind;
pub mod emval;
pub mod env;

use dapper_error::{helpers, Result};
use wasmi::{core::ValType, AsContextMut, Caller, FuncType, Linker, StoreContextMut, Val};

use crate::{
    dyncall::{coerce, invoke, Signature},
    state::HostState,
    trap::into_trap,
};

/// Signature shared by every native import handler
pub type ImportFn = fn(&mut StoreContextMut<'_, HostState>, &[Val]) -> Result<Option<Val>>;

/// Signatures of the `invoke_<sig>` trampolines the host provides
pub const INVOKE_SIGNATURES: &[&str] = &[
    "diii",
    "fiii",
    "id",
    "i",
    "ii",
    "iii",
    "iiii",
    "iiiii",
    "iiiiii",
    "iiiiiii",
    "iiiiiiii",
    "iiiiiiiii",
    "iiiiiiiiii",
    "iiiiiiiiiii",
    "iiiiiiiiiiii",
    "iiiiiiiiiiiii",
    "jiiii",
    "v",
    "vi",
    "vid",
    "vii",
    "viii",
    "viiii",
    "viiiii",
    "viiiiii",
    "viiiiiii",
    "viiiiiiii",
    "viiiiiiiii",
    "viiiiiiiiii",
    "viiiiiiiiiii",
    "viiiiiiiiiiii",
    "viiiiiiiiiiiii",
    "viiiiiiiiiiiiii",
    "viiiiiiiiiiiiiii",
];

/// How an import is satisfied.
#[derive(Clone)]
pub enum ImportHandler {
    /// A native handler
    Native(ImportFn),
    /// An `invoke_<sig>` trampoline
    Invoke(Signature),
}

impl std::fmt::Debug for ImportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::Invoke(signature) => write!(f, "Invoke({signature})"),
        }
    }
}

fn native(name: &str) -> Option<ImportFn> {
    let handler: ImportFn = match name {
        "abort" => env::abort,
        "emscripten_sleep" => env::emscripten_sleep,
        "environ_get" => env::environ_get,
        "environ_sizes_get" => env::environ_sizes_get,
        "fd_write" => env::fd_write,
        "fd_seek" => env::fd_seek,
        "fd_close" => env::fd_close,
        "emscripten_resize_heap" => env::emscripten_resize_heap,
        "emscripten_memcpy_js" | "_emscripten_memcpy_js" => env::emscripten_memcpy_js,
        "strftime_l" => env::strftime_l,
        "__assert_fail" => env::assert_fail,
        "__cxa_throw" => cxa::cxa_throw,
        "__cxa_begin_catch" => cxa::cxa_begin_catch,
        "__cxa_end_catch" => cxa::cxa_end_catch,
        "__cxa_rethrow" => cxa::cxa_rethrow,
        "__cxa_find_matching_catch_2" => cxa::cxa_find_matching_catch_2,
        "__cxa_find_matching_catch_3" => cxa::cxa_find_matching_catch_3,
        "__cxa_uncaught_exceptions" => cxa::cxa_uncaught_exceptions,
        "__resumeException" => cxa::resume_exception,
        "_embind_register_void" => embind::register_void,
        "_embind_register_bool" => embind::register_bool,
        "_embind_register_integer" => embind::register_integer,
        "_embind_register_bigint" => embind::register_bigint,
        "_embind_register_float" => embind::register_float,
        "_embind_register_std_string" => embind::register_std_string,
        "_embind_register_std_wstring" => embind::register_std_wstring,
        "_embind_register_emval" => embind::register_emval,
        "_embind_register_memory_view" => embind::register_memory_view,
        "_embind_register_value_object" => embind::register_value_object,
        "_embind_register_value_object_field" => embind::register_value_object_field,
        "_embind_finalize_value_object" => embind::finalize_value_object,
        "_embind_register_function" => embind::register_function,
        "_emval_incref" => emval::incref,
        "_emval_decref" => emval::decref,
        "_emval_take_value" => emval::take_value,
        "_emval_new_cstring" => emval::new_cstring,
        "_emval_get_global" => emval::get_global,
        "_emval_get_module_property" => emval::get_module_property,
        "_emval_get_property" => emval::get_property,
        "_emval_get_method_caller" => emval::get_method_caller,
        "_emval_call" => emval::call,
        "_emval_call_method" => emval::call_method,
        "_emval_as" => emval::as_type,
        "_emval_await" => emval::await_value,
        "_emval_run_destructors" => emval::run_destructors,
        _ => return None,
    };
    Some(handler)
}

impl ImportHandler {
    /// Handler for the import called `name`
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        if let Some(signature) = name.strip_prefix("invoke_") {
            if !INVOKE_SIGNATURES.contains(&signature) {
                return None;
            }
            return Signature::parse(signature).ok().map(Self::Invoke);
        }
        native(name).map(Self::Native)
    }

    /// Run the handler.
    pub fn call(&self, ctx: &mut StoreContextMut<'_, HostState>, params: &[Val]) -> Result<Option<Val>> {
        match self {
            Self::Native(handler) => handler(ctx, params),
            Self::Invoke(signature) => invoke(ctx, signature, params),
        }
    }
}

fn store_result(value: Option<Val>, result_types: &[ValType], results: &mut [Val]) -> Result<()> {
    let (Some(slot), Some(ty)) = (results.first_mut(), result_types.first()) else {
        return Ok(());
    };
    let value = value.ok_or_else(|| helpers::type_mismatch("import produced no result"))?;
    *slot = coerce(&value, *ty)?;
    Ok(())
}

/// Define the import `module.name` on `linker`.
///
/// # Errors
///
/// Returns `UNRESOLVED_IMPORT` when the dictionary has no handler for `name`.
pub fn define_import(
    linker: &mut Linker<HostState>,
    module: &str,
    name: &str,
    func_type: FuncType,
) -> Result<()> {
    let handler = ImportHandler::lookup(name).ok_or_else(|| helpers::unresolved_import(module, name))?;
    let result_types = func_type.results().to_vec();
    linker
        .func_new(
            module,
            name,
            func_type,
            move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
                let mut ctx = caller.as_context_mut();
                let value = handler.call(&mut ctx, params).map_err(into_trap)?;
                store_result(value, &result_types, results).map_err(into_trap)
            },
        )
        .map_err(|err| helpers::unresolved_import(module, name).context(err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_catalogue() {
        assert!(matches!(ImportHandler::lookup("invoke_vii"), Some(ImportHandler::Invoke(_))));
        assert!(matches!(ImportHandler::lookup("invoke_jiiii"), Some(ImportHandler::Invoke(_))));
        assert!(ImportHandler::lookup("invoke_jj").is_none());
        assert!(ImportHandler::lookup("invoke_viiiiiiiiiiiiiiii").is_none());
        assert_eq!(INVOKE_SIGNATURES.len(), 34);
    }

    #[test]
    fn test_native_lookup() {
        for name in ["fd_write", "_embind_register_function", "_emval_call", "__cxa_throw"] {
            assert!(matches!(ImportHandler::lookup(name), Some(ImportHandler::Native(_))), "{name}");
        }
        assert!(ImportHandler::lookup("pthread_create").is_none());
    }
}
