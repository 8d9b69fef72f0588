// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Prelude module for dapper-host
//!
//! This module provides a unified set of imports for users of the crate.

pub use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
pub use dapper_foundation::{ByteBuffer, Uint8View};
pub use dapper_transport::{SharedTransport, Transport};

pub use crate::callback::{CallbackType, HostCallbacks, TraceDirection};
