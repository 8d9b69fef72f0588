// Dapper - dapper-runtime
// Module: Indirect Calls
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Calling module function pointers through `dynCall_<sig>` exports.
//!
//! A signature string names the return type followed by the parameter types:
//! `v` void, `i`/`p` 32-bit integer or pointer, `j` 64-bit integer, `f`
//! 32-bit float, `d` 64-bit float. Values are coerced to whatever the export
//! actually declares, so a module may pass a pointer where a double is
//! expected and vice versa.

use std::fmt;

use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
use log::{trace, warn};
use wasmi::{
    core::{ValType, F32, F64},
    Func, StoreContextMut, Val,
};

use crate::{state::HostState, trap::from_wasmi};

/// Wire-level type of one signature letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// `i` or `p`
    I32,
    /// `j`
    I64,
    /// `f`
    F32,
    /// `d`
    F64,
}

impl WireKind {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'i' | 'p' => Some(Self::I32),
            'j' => Some(Self::I64),
            'f' => Some(Self::F32),
            'd' => Some(Self::F64),
            _ => None,
        }
    }

    /// Engine value type
    #[must_use]
    pub fn val_type(self) -> ValType {
        match self {
            Self::I32 => ValType::I32,
            Self::I64 => ValType::I64,
            Self::F32 => ValType::F32,
            Self::F64 => ValType::F64,
        }
    }
}

/// Parsed call signature such as `"vii"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    text:   String,
    result: Option<WireKind>,
    params: Vec<WireKind>,
}

impl Signature {
    /// Parse a signature string.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED_CALL_SIGNATURE` for an empty string or an unknown
    /// letter.
    pub fn parse(text: &str) -> Result<Self> {
        let unsupported = |detail: String| {
            Error::new(
                ErrorCategory::Call,
                codes::UNSUPPORTED_CALL_SIGNATURE,
                format!("unsupported call signature {text:?}: {detail}"),
            )
        };
        let mut letters = text.chars();
        let result = match letters.next() {
            None => return Err(unsupported("empty".to_string())),
            Some('v') => None,
            Some(letter) => Some(
                WireKind::from_letter(letter)
                    .ok_or_else(|| unsupported(format!("unknown letter {letter:?}")))?,
            ),
        };
        let params = letters
            .map(|letter| {
                WireKind::from_letter(letter)
                    .ok_or_else(|| unsupported(format!("unknown letter {letter:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            text: text.to_string(),
            result,
            params,
        })
    }

    /// The signature as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Result type, `None` for void
    #[must_use]
    pub fn result(&self) -> Option<WireKind> {
        self.result
    }

    /// Parameter types
    #[must_use]
    pub fn params(&self) -> &[WireKind] {
        &self.params
    }

    /// Name of the export dispatching this signature
    #[must_use]
    pub fn export_name(&self) -> String {
        format!("dynCall_{}", self.text)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A module function pointer together with its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DynCallTarget {
    /// Signature of the pointee
    pub signature: Signature,
    /// Table index
    pub index:     i32,
}

impl DynCallTarget {
    /// Pair a signature with a table index.
    #[must_use]
    pub fn new(signature: Signature, index: i32) -> Self {
        Self { signature, index }
    }

    /// Parse `signature` and pair it with `index`.
    pub fn parse(signature: &str, index: i32) -> Result<Self> {
        Ok(Self::new(Signature::parse(signature)?, index))
    }

    /// Call the pointee.
    pub fn call(&self, ctx: &mut StoreContextMut<'_, HostState>, args: &[Val]) -> Result<Option<Val>> {
        dyn_call(ctx, &self.signature, self.index, args)
    }
}

/// Call table entry `index` through the `dynCall_<sig>` export.
///
/// # Errors
///
/// Returns `UNSUPPORTED_CALL_SIGNATURE` when the module does not export a
/// dispatcher for `signature`, and passes through whatever the call raises.
pub fn dyn_call(
    ctx: &mut StoreContextMut<'_, HostState>,
    signature: &Signature,
    index: i32,
    args: &[Val],
) -> Result<Option<Val>> {
    let name = signature.export_name();
    let func = ctx
        .data()
        .exports
        .get(&name)
        .ok_or_else(|| helpers::unsupported_call_signature(signature.as_str()))?;
    trace!("{name}({index}, {} args)", args.len());
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(Val::I32(index));
    full.extend_from_slice(args);
    call_func(ctx, func, &name, &full)
}

/// Call `func`, coercing `args` to its declared parameter types.
///
/// Returns the first result, if the function has one.
pub fn call_func(
    ctx: &mut StoreContextMut<'_, HostState>,
    func: Func,
    name: &str,
    args: &[Val],
) -> Result<Option<Val>> {
    let ty = func.ty(&*ctx);
    if ty.params().len() != args.len() {
        return Err(helpers::argument_count_mismatch(name, ty.params().len(), args.len()));
    }
    let params = args
        .iter()
        .zip(ty.params())
        .map(|(arg, param)| coerce(arg, *param))
        .collect::<Result<Vec<_>>>()?;
    let mut results: Vec<Val> = ty.results().iter().map(|result| Val::default(*result)).collect();
    func.call(&mut *ctx, &params, &mut results).map_err(from_wasmi)?;
    Ok(results.into_iter().next())
}

/// Call the export `name`.
///
/// # Errors
///
/// Returns `EXPORT_NOT_FOUND` when the module has no such function.
pub fn call_export(
    ctx: &mut StoreContextMut<'_, HostState>,
    name: &str,
    args: &[Val],
) -> Result<Option<Val>> {
    let func = ctx.data().exports.require(name)?;
    call_func(ctx, func, name, args)
}

/// Convert `value` to the engine type `ty`.
///
/// # Errors
///
/// Returns `TYPE_MISMATCH` for conversions the wire never performs.
pub fn coerce(value: &Val, ty: ValType) -> Result<Val> {
    let converted = match (value, ty) {
        (Val::I32(v), ValType::I32) => Val::I32(*v),
        (Val::I32(v), ValType::I64) => Val::I64(i64::from(*v)),
        (Val::I32(v), ValType::F64) => Val::F64(F64::from(f64::from(*v))),
        (Val::I32(v), ValType::F32) => Val::F32(F32::from(*v as f32)),
        (Val::I64(v), ValType::I64) => Val::I64(*v),
        (Val::I64(v), ValType::I32) => Val::I32(*v as i32),
        (Val::F32(v), ValType::F32) => Val::F32(*v),
        (Val::F32(v), ValType::F64) => Val::F64(F64::from(f64::from(f32::from(*v)))),
        (Val::F64(v), ValType::F64) => Val::F64(*v),
        (Val::F64(v), ValType::F32) => Val::F32(F32::from(f64::from(*v) as f32)),
        (Val::F64(v), ValType::I32) => Val::I32(f64::from(*v) as i32),
        (Val::F64(v), ValType::I64) => Val::I64(f64::from(*v) as i64),
        (value, ty) => {
            return Err(helpers::type_mismatch(format!(
                "cannot pass {:?} where {ty:?} is expected",
                value.ty()
            )));
        }
    };
    Ok(converted)
}

/// Parameter `index` as `i32`.
pub fn arg_i32(params: &[Val], index: usize) -> Result<i32> {
    match params.get(index) {
        Some(Val::I32(v)) => Ok(*v),
        Some(Val::I64(v)) => Ok(*v as i32),
        Some(Val::F64(v)) => Ok(f64::from(*v) as i32),
        Some(other) => Err(helpers::type_mismatch(format!(
            "parameter {index} is {:?}, expected i32",
            other.ty()
        ))),
        None => Err(helpers::index_out_of_range(index as i64, params.len())),
    }
}

/// Parameter `index` as an address.
pub fn arg_u32(params: &[Val], index: usize) -> Result<u32> {
    arg_i32(params, index).map(|v| v as u32)
}

/// Parameter `index` as `i64`.
pub fn arg_i64(params: &[Val], index: usize) -> Result<i64> {
    match params.get(index) {
        Some(Val::I64(v)) => Ok(*v),
        Some(_) => arg_i32(params, index).map(i64::from),
        None => Err(helpers::index_out_of_range(index as i64, params.len())),
    }
}

/// Parameter `index` as `f64`.
pub fn arg_f64(params: &[Val], index: usize) -> Result<f64> {
    match params.get(index) {
        Some(Val::F64(v)) => Ok(f64::from(*v)),
        Some(Val::F32(v)) => Ok(f64::from(f32::from(*v))),
        Some(Val::I64(v)) => Ok(*v as f64),
        Some(_) => arg_i32(params, index).map(f64::from),
        None => Err(helpers::index_out_of_range(index as i64, params.len())),
    }
}

/// Integer carried by a result value.
pub fn wire_i64(value: &Val) -> Result<i64> {
    match value {
        Val::I32(v) => Ok(i64::from(*v)),
        Val::I64(v) => Ok(*v),
        Val::F64(v) => Ok(f64::from(*v) as i64),
        Val::F32(v) => Ok(f32::from(*v) as i64),
        other => Err(helpers::type_mismatch(format!("{:?} is not a number", other.ty()))),
    }
}

/// Float carried by a result value.
pub fn wire_f64(value: &Val) -> Result<f64> {
    match value {
        Val::F64(v) => Ok(f64::from(*v)),
        Val::F32(v) => Ok(f64::from(f32::from(*v))),
        Val::I32(v) => Ok(f64::from(*v)),
        Val::I64(v) => Ok(*v as f64),
        other => Err(helpers::type_mismatch(format!("{:?} is not a number", other.ty()))),
    }
}

fn first_export(ctx: &StoreContextMut<'_, HostState>, names: &[&str]) -> Option<(Func, String)> {
    names
        .iter()
        .find_map(|name| ctx.data().exports.get(name).map(|func| (func, (*name).to_string())))
}

/// Current stack pointer, when stack control is enabled.
pub fn stack_save(ctx: &mut StoreContextMut<'_, HostState>) -> Result<Option<i32>> {
    if !ctx.data().config.stack_control {
        return Ok(None);
    }
    let Some((func, name)) = first_export(ctx, &["stackSave", "emscripten_stack_get_current"])
    else {
        return Ok(None);
    };
    let sp = call_func(ctx, func, &name, &[])?;
    sp.as_ref().map(wire_i64).transpose().map(|sp| sp.map(|sp| sp as i32))
}

/// Restore a stack pointer taken by [`stack_save`].
pub fn stack_restore(ctx: &mut StoreContextMut<'_, HostState>, sp: Option<i32>) -> Result<()> {
    let Some(sp) = sp else {
        return Ok(());
    };
    let Some((func, name)) = first_export(ctx, &["stackRestore", "_emscripten_stack_restore"])
    else {
        return Ok(());
    };
    call_func(ctx, func, &name, &[Val::I32(sp)])?;
    Ok(())
}

/// Reserve `size` bytes on the module's stack.
///
/// # Errors
///
/// Returns `EXPORT_NOT_FOUND` when the module exports no stack allocator.
pub fn stack_alloc(ctx: &mut StoreContextMut<'_, HostState>, size: i32) -> Result<u32> {
    let (func, name) = first_export(ctx, &["stackAlloc", "_emscripten_stack_alloc"])
        .ok_or_else(|| helpers::export_not_found("stackAlloc"))?;
    let ptr = call_func(ctx, func, &name, &[Val::I32(size)])?
        .ok_or_else(|| helpers::type_mismatch("stackAlloc returned nothing"))?;
    Ok(wire_i64(&ptr)? as u32)
}

/// Run an `invoke_<sig>` trampoline.
///
/// `params[0]` is the table index, the rest are forwarded. If the call fails
/// the stack pointer is put back before the error is passed on.
pub fn invoke(
    ctx: &mut StoreContextMut<'_, HostState>,
    signature: &Signature,
    params: &[Val],
) -> Result<Option<Val>> {
    let index = arg_i32(params, 0)?;
    let sp = stack_save(ctx)?;
    match dyn_call(ctx, signature, index, &params[1..]) {
        Ok(result) => Ok(result),
        Err(err) => {
            if let Err(restore) = stack_restore(ctx, sp) {
                warn!("stack restore after failed invoke_{signature} failed: {restore}");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signatures() {
        let sig = Signature::parse("vid").unwrap();
        assert_eq!(sig.result(), None);
        assert_eq!(sig.params(), &[WireKind::I32, WireKind::F64]);
        assert_eq!(sig.export_name(), "dynCall_vid");
        let sig = Signature::parse("jp").unwrap();
        assert_eq!(sig.result(), Some(WireKind::I64));
        assert_eq!(sig.params(), &[WireKind::I32]);
    }

    #[test]
    fn test_parse_rejects_unknown_letters() {
        assert_eq!(Signature::parse("").unwrap_err().code, codes::UNSUPPORTED_CALL_SIGNATURE);
        assert_eq!(Signature::parse("ix").unwrap_err().code, codes::UNSUPPORTED_CALL_SIGNATURE);
        assert_eq!(Signature::parse("iv").unwrap_err().code, codes::UNSUPPORTED_CALL_SIGNATURE);
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce(&Val::I32(-1), ValType::I64).unwrap().i64(), Some(-1));
        assert_eq!(coerce(&Val::I64(1 << 33 | 5), ValType::I32).unwrap().i32(), Some(5));
        let as_f64 = coerce(&Val::I32(3), ValType::F64).unwrap();
        assert_eq!(as_f64.f64().map(f64::from), Some(3.0));
        let back = coerce(&Val::F64(F64::from(7.9)), ValType::I32).unwrap();
        assert_eq!(back.i32(), Some(7));
        assert_eq!(
            coerce(&Val::F32(F32::from(1.0)), ValType::I32).unwrap_err().code,
            codes::TYPE_MISMATCH
        );
    }

    #[test]
    fn test_argument_helpers() {
        let params = [Val::I32(-4), Val::I64(9), Val::F64(F64::from(2.5))];
        assert_eq!(arg_u32(&params, 0).unwrap(), u32::MAX - 3);
        assert_eq!(arg_i64(&params, 1).unwrap(), 9);
        assert_eq!(arg_f64(&params, 2).unwrap(), 2.5);
        assert_eq!(arg_i32(&params, 3).unwrap_err().code, codes::INDEX_OUT_OF_RANGE);
    }
}
