// Dapper - dapper-runtime
// Module: Crate Root
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)] // Rule 2

//! Host runtime for embind/emscripten WebAssembly modules.
//!
//! The hosted module is compiled C++ that talks to a debug probe. It
//! registers its types and functions through `_embind_*` imports while its
//! static constructors run, reaches host objects through `_emval_*` imports,
//! and moves probe packets through the `readData`/`writeData` globals.
//!
//! This crate provides:
//!
//! - [`ModuleHost`]: loading, linking and the lifecycle up to
//!   [`HostPhase::Ready`]
//! - The import dictionary (`env`, `wasi_snapshot_preview1`, embind, emval,
//!   C++ exceptions, `invoke_*` trampolines)
//! - [`TypeRegistry`] and the wire converters for every registered type
//! - [`EmvalTable`], the handle table behind `emscripten::val`
//! - [`LinearMemory`] and the Latin-1 string codec
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dapper_runtime::prelude::*;
//!
//! # fn main() -> dapper_runtime::Result<()> {
//! let mut host = ModuleHost::new(HostConfig::default())?;
//! host.callbacks_mut().set_stdout(|text| log::info!("module: {text}"));
//! host.initialize()?;
//! let sum = host.call("add", &[Value::Int(2), Value::Int(3)])?;
//! assert_eq!(sum, Value::Int(5));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_panics_doc)]

// Export modules
pub mod config;
pub mod converters;
pub mod dyncall;
pub mod emval;
pub mod exceptions;
pub mod functions;
pub mod host;
pub mod imports;
pub mod memory;
pub mod prelude;
pub mod registry;
pub mod state;
pub mod strings;
pub mod structs;
pub mod trap;
pub mod value;

// Reexport types for convenience
pub use config::HostConfig;
pub use dapper_error::{Error, ErrorCategory, Result};
pub use dyncall::{DynCallTarget, Signature};
pub use emval::EmvalTable;
pub use host::{HostPhase, ModuleHost, ModuleSource};
pub use memory::LinearMemory;
pub use registry::{ConverterKind, TypeConverter, TypeRegistry};
pub use state::HostState;
pub use value::{Destructor, HeapView, HostFunction, Value, ViewKind};
pub use wasmi::Val;
