// Dapper - dapper-error
// Module: Dapper Error Handling
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Dapper error handling library
//!
//! Every crate in the workspace reports failures through [`Error`]: a
//! category, a numeric code and a message. Errors thrown by a hosted module
//! additionally carry the extracted exception type and message.
//!
//! # Error Categories
//!
//! ## Marshaling Errors (1000-1008)
//! - Invalid handles and type ids
//! - Missing struct fields
//! - Wire type mismatches
//!
//! ## Call Errors (2000-2006)
//! - Unsupported dynCall signatures and arities
//! - Unknown functions and unbound types
//!
//! ## Memory Errors (3000-3002)
//!
//! ## Lifecycle Errors (4000-4006)
//! - Unresolved imports
//! - Calls before the host is ready
//!
//! ## Module Errors (5000-5004)
//! - C++ exceptions, aborts and traps
//!
//! ## I/O Errors (6000-6005)
//! - Console descriptors and device transports
//!
//! # Usage
//!
//! ```
//! use dapper_error::{codes, helpers, Error, ErrorCategory};
//!
//! let error = Error::new(
//!     ErrorCategory::Call,
//!     codes::FUNCTION_NOT_FOUND,
//!     "no function named reset was registered",
//! );
//! assert_eq!(error.code, codes::FUNCTION_NOT_FOUND);
//!
//! let missing = helpers::missing_field("speed");
//! assert_eq!(missing.message, "Missing field: speed");
//! ```

#![forbid(unsafe_code)] // Rule 2
#![deny(clippy::all)]
#![deny(clippy::perf)]
#![allow(clippy::cargo)]
#![warn(clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Error codes for Dapper
pub mod codes;
/// Error and error handling types
pub mod errors;
pub mod helpers;

// Re-export key types
pub use errors::{Error, ErrorCategory, ErrorSource, ModuleException};

/// A specialized `Result` type for Dapper operations.
pub type Result<T> = core::result::Result<T, Error>;

