// Dapper - dapper-runtime
// Module: Embind Functions
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Free functions exported with `emscripten::function`.
//!
//! A registered function is callable once its return and argument types are
//! all registered. Until then its name maps to [`FunctionEntry::Unbound`] and
//! calls report which types are missing.

use std::sync::Arc;

use dapper_error::{helpers, Result};
use log::debug;
use wasmi::{StoreContextMut, Val};

use crate::{
    converters::{from_wire, run_destructors, to_wire},
    dyncall::DynCallTarget,
    registry::{RawType, TypeConverter},
    state::HostState,
    value::Value,
};

/// A function registration waiting for its types.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBinding {
    /// Exposed name
    pub name:           String,
    /// Invoker `(fn, args...)`
    pub invoker:        DynCallTarget,
    /// Function pointer handed to the invoker
    pub function_index: i32,
    /// Whether the module marked the function async
    pub is_async:       bool,
}

impl FunctionBinding {
    /// Attach the resolved converters: return type first, then arguments.
    ///
    /// # Errors
    ///
    /// Returns `CONVERTER_COUNT_MISMATCH` without a return type converter.
    pub fn bind(self, converters: Vec<TypeConverter>) -> Result<EmbindFunction> {
        let mut converters = converters.into_iter();
        let return_type = converters.next().ok_or_else(|| helpers::converter_count_mismatch(1, 0))?;
        debug!("bound function {}", self.name);
        Ok(EmbindFunction {
            name: self.name,
            return_type,
            arg_types: converters.collect(),
            invoker: self.invoker,
            function_index: self.function_index,
            is_async: self.is_async,
        })
    }
}

/// A callable function.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbindFunction {
    /// Exposed name
    pub name:           String,
    /// Converter for the result
    pub return_type:    TypeConverter,
    /// Converters for the arguments
    pub arg_types:      Vec<TypeConverter>,
    /// Invoker `(fn, args...)`
    pub invoker:        DynCallTarget,
    /// Function pointer handed to the invoker
    pub function_index: i32,
    /// Whether the module marked the function async
    pub is_async:       bool,
}

impl EmbindFunction {
    /// Human readable signature such as `add(int, int) -> int`
    #[must_use]
    pub fn signature(&self) -> String {
        let args: Vec<_> = self.arg_types.iter().map(|arg| arg.name.as_str()).collect();
        format!("{}({}) -> {}", self.name, args.join(", "), self.return_type.name)
    }

    /// Call with host values.
    ///
    /// Argument destructors run after the call whether or not it succeeded.
    ///
    /// # Errors
    ///
    /// Returns `ARGUMENT_COUNT_MISMATCH` for the wrong number of arguments and
    /// passes through conversion and call failures.
    pub fn invoke(&self, ctx: &mut StoreContextMut<'_, HostState>, args: &[Value]) -> Result<Value> {
        if args.len() != self.arg_types.len() {
            return Err(helpers::argument_count_mismatch(&self.name, self.arg_types.len(), args.len()));
        }
        let mut destructors = Vec::new();
        let mut wired = Vec::with_capacity(args.len() + 1);
        wired.push(Val::I32(self.function_index));
        for (converter, arg) in self.arg_types.iter().zip(args) {
            match to_wire(ctx, converter, Some(&mut destructors), arg) {
                Ok(wire) => wired.push(wire),
                Err(err) => {
                    run_destructors(ctx, destructors)?;
                    return Err(err.context(format!("argument of {}", self.name)));
                }
            }
        }
        let result = self.invoker.call(ctx, &wired);
        run_destructors(ctx, destructors)?;
        let result = result?;
        if self.return_type.is_void() {
            return Ok(Value::Undefined);
        }
        let wire = result
            .ok_or_else(|| helpers::type_mismatch(format!("invoker of {} returned nothing", self.name)))?;
        from_wire(ctx, &self.return_type, &wire)
    }
}

/// Entry in the function table.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionEntry {
    /// Registered, but some types are missing
    Unbound {
        /// Return type followed by argument types
        types: Vec<RawType>,
    },
    /// Ready to call
    Bound(Arc<EmbindFunction>),
}

/// Name under which a function is exposed.
///
/// A signature-style name such as `add(a, b)` is exposed as `add`.
///
/// # Errors
///
/// Returns `INVALID_ARGUMENT` when a `(` is not matched by a trailing `)`.
pub fn exposed_name(name: &str) -> Result<String> {
    let name = name.trim();
    match name.find('(') {
        None => Ok(name.to_string()),
        Some(_) if !name.ends_with(')') => Err(helpers::invalid_argument(format!(
            "Parentheses for argument names should match: {name}"
        ))),
        Some(index) => Ok(name[..index].to_string()),
    }
}

/// Call the function exposed as `name`.
///
/// # Errors
///
/// Returns `FUNCTION_NOT_FOUND` for an unknown name and `UNBOUND_TYPES` while
/// the function's types are incomplete.
pub fn call_function(ctx: &mut StoreContextMut<'_, HostState>, name: &str, args: &[Value]) -> Result<Value> {
    let entry = ctx.data().functions.get(name).cloned().ok_or_else(|| helpers::function_not_found(name))?;
    match entry {
        FunctionEntry::Unbound { types } => {
            let missing = ctx.data().registry.unbound_types(&types);
            Err(helpers::unbound_types(name, &missing))
        }
        FunctionEntry::Bound(function) => function.invoke(ctx, args),
    }
}

#[cfg(test)]
mod tests {
    use dapper_error::codes;

    use super::*;
    use crate::registry::ConverterKind;

    #[test]
    fn test_exposed_name() {
        assert_eq!(exposed_name("  add ").unwrap(), "add");
        assert_eq!(exposed_name("add(a, b)").unwrap(), "add");
        assert_eq!(exposed_name("add(a, b").unwrap_err().code, codes::INVALID_ARGUMENT);
    }

    #[test]
    fn test_bind_splits_return_type() {
        let binding = FunctionBinding {
            name:           "add".to_string(),
            invoker:        DynCallTarget::parse("iiii", 1).unwrap(),
            function_index: 2,
            is_async:       false,
        };
        let int = TypeConverter::new("int", ConverterKind::Integer { size: 4, signed: true });
        let function = binding.clone().bind(vec![int.clone(), int.clone(), int]).unwrap();
        assert_eq!(function.signature(), "add(int, int) -> int");
        assert_eq!(binding.bind(vec![]).unwrap_err().code, codes::CONVERTER_COUNT_MISMATCH);
    }
}
