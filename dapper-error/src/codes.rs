// Dapper - dapper-error
// Module: Dapper Error Codes
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error codes for the Dapper module host

// Marshaling error codes (1000-1999)
/// An argument was rejected before any work was done
pub const INVALID_ARGUMENT: u16 = 1000;
/// Element index outside a byte or word view
pub const INDEX_OUT_OF_RANGE: u16 = 1001;
/// Handle does not refer to a live emval slot
pub const INVALID_HANDLE: u16 = 1002;
/// Type id is zero or negative
pub const INVALID_TYPE_ID: u16 = 1003;
/// No converter registered for a type id
pub const UNREGISTERED_TYPE: u16 = 1004;
/// Struct value lacks a declared field
pub const MISSING_FIELD: u16 = 1005;
/// Value cannot be converted to the requested wire type
pub const TYPE_MISMATCH: u16 = 1006;
/// Dependency resolution produced the wrong number of converters
pub const CONVERTER_COUNT_MISMATCH: u16 = 1007;
/// Text cannot be represented in the string codec
pub const STRING_ENCODING: u16 = 1008;

// Call error codes (2000-2999)
/// No `dynCall_<sig>` export for the requested signature
pub const UNSUPPORTED_CALL_SIGNATURE: u16 = 2000;
/// Method caller arity outside the supported range
pub const UNSUPPORTED_ARITY: u16 = 2001;
/// No registered function under the requested name
pub const FUNCTION_NOT_FOUND: u16 = 2002;
/// Wrong number of arguments for a call
pub const ARGUMENT_COUNT_MISMATCH: u16 = 2003;
/// Method caller id was never handed out
pub const INVALID_METHOD_CALLER: u16 = 2004;
/// Function called before all of its types were registered
pub const UNBOUND_TYPES: u16 = 2005;
/// Required module export is missing
pub const EXPORT_NOT_FOUND: u16 = 2006;

// Memory error codes (3000-3999)
/// Linear memory access outside the current size
pub const MEMORY_OUT_OF_BOUNDS: u16 = 3000;
/// Module has neither imported nor exported memory
pub const MEMORY_NOT_FOUND: u16 = 3001;
/// Module asked the host to grow its heap
pub const MEMORY_GROWTH_UNSUPPORTED: u16 = 3002;

// Load and lifecycle error codes (4000-4999)
/// Module bytes could not be read
pub const MODULE_LOAD_ERROR: u16 = 4000;
/// Module bytes failed validation
pub const MALFORMED_MODULE: u16 = 4001;
/// Module requires an import the host does not provide
pub const UNRESOLVED_IMPORT: u16 = 4002;
/// Instantiation failed after imports were bound
pub const INSTANTIATION_ERROR: u16 = 4003;
/// Call attempted before the host reached `Ready`
pub const HOST_NOT_READY: u16 = 4004;
/// Lifecycle step attempted out of order
pub const INVALID_STATE_TRANSITION: u16 = 4005;
/// Configuration could not be read or parsed
pub const CONFIG_ERROR: u16 = 4006;

// Module-raised error codes (5000-5999)
/// Module threw a C++ exception
pub const MODULE_EXCEPTION: u16 = 5000;
/// Module called `abort`
pub const MODULE_ABORT: u16 = 5001;
/// Module trapped inside the interpreter
pub const MODULE_TRAP: u16 = 5002;
/// Module reached an import the host deliberately leaves unimplemented
pub const NOT_IMPLEMENTED: u16 = 5003;
/// Module assertion failed
pub const ASSERTION_FAILED: u16 = 5004;

// I/O and transport error codes (6000-6999)
/// `fd_write` on a descriptor other than stdout or stderr
pub const UNSUPPORTED_DESCRIPTOR: u16 = 6000;
/// Transport backend failure
pub const TRANSPORT_ERROR: u16 = 6001;
/// No data arrived before the read timeout
pub const TRANSPORT_TIMEOUT: u16 = 6002;
/// Read or write before the transport was opened
pub const TRANSPORT_NOT_OPEN: u16 = 6003;
/// No probe with the requested serial number
pub const PROBE_NOT_FOUND: u16 = 6004;
/// Power request was not acknowledged
pub const POWER_CONTROL_FAILED: u16 = 6005;

// System error codes (7000-7999)
/// Shared state lock was poisoned by a panicking thread
pub const POISONED_LOCK: u16 = 7000;
