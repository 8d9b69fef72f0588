// Dapper - dapper-error
// Module: Dapper Error Helpers
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error helper functions for common error patterns.
//!
//! One constructor per error condition the host reports, so call sites read
//! as the condition they detect.

use crate::{codes, Error, ErrorCategory};

/// Create an invalid argument error
#[must_use]
pub fn invalid_argument(message: impl Into<String>) -> Error {
    Error::new(ErrorCategory::Parameter, codes::INVALID_ARGUMENT, message)
}

/// Create an index out of range error
#[must_use]
pub fn index_out_of_range(index: i64, len: usize) -> Error {
    Error::new(
        ErrorCategory::Parameter,
        codes::INDEX_OUT_OF_RANGE,
        format!("index {index} out of range for length {len}"),
    )
}

/// Create an invalid emval handle error
#[must_use]
pub fn invalid_handle(handle: u32) -> Error {
    Error::new(
        ErrorCategory::Marshaling,
        codes::INVALID_HANDLE,
        format!("emval handle {handle} does not refer to a live value"),
    )
}

/// Create an invalid type id error
#[must_use]
pub fn invalid_type_id(name: &str) -> Error {
    Error::new(
        ErrorCategory::Marshaling,
        codes::INVALID_TYPE_ID,
        format!("type {name} must have positive pointer"),
    )
}

/// Create an unregistered type error
#[must_use]
pub fn unregistered_type(raw_type: u32) -> Error {
    Error::new(
        ErrorCategory::Marshaling,
        codes::UNREGISTERED_TYPE,
        format!("no converter registered for type id {raw_type}"),
    )
}

/// Create a missing struct field error
#[must_use]
pub fn missing_field(field: &str) -> Error {
    Error::new(ErrorCategory::Marshaling, codes::MISSING_FIELD, format!("Missing field: {field}"))
}

/// Create a wire type mismatch error
#[must_use]
pub fn type_mismatch(message: impl Into<String>) -> Error {
    Error::new(ErrorCategory::Marshaling, codes::TYPE_MISMATCH, message)
}

/// Create a converter count mismatch error
#[must_use]
pub fn converter_count_mismatch(expected: usize, actual: usize) -> Error {
    Error::new(
        ErrorCategory::Marshaling,
        codes::CONVERTER_COUNT_MISMATCH,
        format!("Mismatched type converter count: expected {expected}, got {actual}"),
    )
}

/// Create a string encoding error
#[must_use]
pub fn string_encoding(message: impl Into<String>) -> Error {
    Error::new(ErrorCategory::Marshaling, codes::STRING_ENCODING, message)
}

/// Create an unsupported call signature error naming the missing export
#[must_use]
pub fn unsupported_call_signature(signature: &str) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::UNSUPPORTED_CALL_SIGNATURE,
        format!("dynCall_{signature} is not defined, bad function pointer"),
    )
}

/// Create an unsupported arity error
#[must_use]
pub fn unsupported_arity(arity: usize, max: usize) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::UNSUPPORTED_ARITY,
        format!("arity {arity} not supported, at most {max} arguments"),
    )
}

/// Create a function not found error
#[must_use]
pub fn function_not_found(name: &str) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::FUNCTION_NOT_FOUND,
        format!("no function named {name} was registered"),
    )
}

/// Create an argument count mismatch error
#[must_use]
pub fn argument_count_mismatch(name: &str, expected: usize, actual: usize) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::ARGUMENT_COUNT_MISMATCH,
        format!("{name} expects {expected} arguments, got {actual}"),
    )
}

/// Create an unbound types error
#[must_use]
pub fn unbound_types(name: &str, missing: &[u32]) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::UNBOUND_TYPES,
        format!("Cannot call {name} due to unbound types: {missing:?}"),
    )
}

/// Create an export not found error
#[must_use]
pub fn export_not_found(name: &str) -> Error {
    Error::new(
        ErrorCategory::Call,
        codes::EXPORT_NOT_FOUND,
        format!("module does not export {name}"),
    )
}

/// Create a memory out of bounds error
#[must_use]
pub fn memory_out_of_bounds(offset: u64, len: u64, size: usize) -> Error {
    Error::new(
        ErrorCategory::Memory,
        codes::MEMORY_OUT_OF_BOUNDS,
        format!("access of {len} bytes at {offset:#x} exceeds memory size {size:#x}"),
    )
}

/// Create a memory not found error
#[must_use]
pub fn memory_not_found() -> Error {
    Error::new(
        ErrorCategory::Memory,
        codes::MEMORY_NOT_FOUND,
        "module has no linear memory",
    )
}

/// Create an unresolved import error
#[must_use]
pub fn unresolved_import(module: &str, name: &str) -> Error {
    Error::new(
        ErrorCategory::Initialization,
        codes::UNRESOLVED_IMPORT,
        format!("{module}.{name} not found in wasm imports"),
    )
}

/// Create a host not ready error
#[must_use]
pub fn host_not_ready(phase: impl core::fmt::Debug) -> Error {
    Error::new(
        ErrorCategory::Initialization,
        codes::HOST_NOT_READY,
        format!("module host is not ready (phase {phase:?})"),
    )
}

/// Create an invalid lifecycle transition error
#[must_use]
pub fn invalid_state_transition(from: impl core::fmt::Debug, to: impl core::fmt::Debug) -> Error {
    Error::new(
        ErrorCategory::Initialization,
        codes::INVALID_STATE_TRANSITION,
        format!("cannot move from {from:?} to {to:?}"),
    )
}

/// Create a configuration error
#[must_use]
pub fn config_error(message: impl Into<String>) -> Error {
    Error::new(ErrorCategory::Initialization, codes::CONFIG_ERROR, message)
}

/// Create a not implemented error for a module import
#[must_use]
pub fn not_implemented(what: &str) -> Error {
    Error::new(
        ErrorCategory::NotImplemented,
        codes::NOT_IMPLEMENTED,
        format!("{what} is not implemented"),
    )
}

/// Create an unsupported file descriptor error
#[must_use]
pub fn unsupported_descriptor(fd: i32) -> Error {
    Error::new(
        ErrorCategory::Io,
        codes::UNSUPPORTED_DESCRIPTOR,
        format!("Unknown file descriptor: {fd}"),
    )
}

/// Create a transport error
#[must_use]
pub fn transport_error(message: impl Into<String>) -> Error {
    Error::new(ErrorCategory::Io, codes::TRANSPORT_ERROR, message)
}

/// Create a transport not open error
#[must_use]
pub fn transport_not_open() -> Error {
    Error::new(
        ErrorCategory::Io,
        codes::TRANSPORT_NOT_OPEN,
        "Device interface needs to be opened first.",
    )
}

/// Create a power control failure error
#[must_use]
pub fn power_control_failed(sys_power: bool) -> Error {
    let domain = if sys_power { "System" } else { "Debug" };
    Error::new(
        ErrorCategory::Io,
        codes::POWER_CONTROL_FAILED,
        format!("{domain} power request was not acknowledged"),
    )
}

/// Create a poisoned lock error
#[must_use]
pub fn poisoned_lock(what: &str) -> Error {
    Error::new(
        ErrorCategory::System,
        codes::POISONED_LOCK,
        format!("lock guarding {what} was poisoned"),
    )
}
