// Dapper - dapper-runtime
// Module: Host Traps
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Carrying host errors through wasm frames.
//!
//! An import that fails raises a [`HostTrap`]. The engine unwinds every wasm
//! frame back to the host call that entered the module, where
//! [`from_wasmi`] recovers the original [`Error`] unchanged.

use std::fmt;

use dapper_error::{codes, Error, ErrorCategory};

/// Host error travelling as a wasm trap.
#[derive(Debug)]
pub struct HostTrap(pub Error);

impl fmt::Display for HostTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl wasmi::core::HostError for HostTrap {}

/// Wrap a host error so it can cross wasm frames.
#[must_use]
pub fn into_trap(error: Error) -> wasmi::Error {
    wasmi::Error::host(HostTrap(error))
}

/// Convert an engine error back into a host error.
///
/// Errors raised by imports come back as they were raised; anything else the
/// engine reports becomes a [`codes::MODULE_TRAP`].
#[must_use]
pub fn from_wasmi(error: wasmi::Error) -> Error {
    if let Some(HostTrap(inner)) = error.downcast_ref::<HostTrap>() {
        return inner.clone();
    }
    Error::new(ErrorCategory::Module, codes::MODULE_TRAP, error.to_string())
}
