// Dapper - dapper-foundation
// Module: Foundation Types
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Foundation types for the Dapper module host.
//!
//! Provides the byte arrays exchanged between the host, the hosted module and
//! device transports. Views are cheap to clone and share their storage.

#![forbid(unsafe_code)] // Rule 2
#![warn(clippy::pedantic)]
#![deny(missing_docs)]

pub mod arrays;

pub use arrays::{ByteBuffer, Int32View, Uint8View, ViewProperty, INT32_ELEMENT_SIZE};
pub use dapper_error::{Error, Result};

/// Commonly used items
pub mod prelude {
    pub use crate::arrays::{ByteBuffer, Int32View, Uint8View, ViewProperty};
    pub use dapper_error::{codes, Error, ErrorCategory, Result};
}
