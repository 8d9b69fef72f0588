// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)] // Rule 2

//! Host callback infrastructure for the Dapper module host.
//!
//! The hosted module reaches the outside world through a handful of globals.
//! This crate holds the host side of those globals as a strategy object,
//! [`HostCallbacks`], with defaults that route device traffic to a transport
//! and text to the console.
//!
//! ## Usage
//!
//! ```rust
//! use dapper_host::prelude::*;
//!
//! let mut callbacks = HostCallbacks::new();
//! callbacks.set_stdout(|text| log::info!("module: {text}"));
//! callbacks.set_read_data(|| Ok(Uint8View::from_slice(&[0x00, 0x01])));
//! assert_eq!(callbacks.read_data().unwrap().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_panics_doc)]

// Export modules
pub mod callback;
pub mod prelude;

// Reexport types for convenience
pub use callback::{
    CallbackType, HostCallbacks, ReadDataHandler, TextHandler, TraceDirection, TraceHandler,
    WriteDataHandler,
};
