//! # Dapper Logging
//!
//! Logging infrastructure for the Dapper module host.
//!
//! The hosted module writes diagnostics to its stdout and stderr descriptors.
//! This crate lets an embedder receive that text as structured
//! [`LogOperation`]s by registering a handler on the host callbacks.

// Dapper - dapper-logging
// Module: Logging Infrastructure
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)] // Rule 2
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Reexports for convenience
pub use dapper_error::{Error, Result};
pub use dapper_host::HostCallbacks;

/// Logging handlers for processing log messages.
pub mod handler;

/// Log level definitions for categorizing message severity.
pub mod level;

/// Log operation data structures.
pub mod operation;

pub use handler::{log_facade_handler, LogHandler, LoggingExt};
pub use level::LogLevel;
pub use operation::{LogOperation, MODULE_COMPONENT_ID};
