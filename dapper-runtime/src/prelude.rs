// Dapper - dapper-runtime
// Module: Prelude
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Prelude module for dapper-runtime
//!
//! This module provides a unified set of imports for users of the crate.

pub use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
pub use dapper_foundation::{ByteBuffer, Int32View, Uint8View};
pub use dapper_host::{HostCallbacks, TraceDirection};
pub use dapper_logging::{LogLevel, LogOperation, LoggingExt};
pub use dapper_transport::{SharedTransport, Transport};
pub use wasmi::Val;

pub use crate::{
    config::HostConfig,
    host::{HostPhase, ModuleHost, ModuleSource},
    value::{HeapView, Value, ViewKind},
};
