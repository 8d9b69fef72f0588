// Dapper - dapper
// Module: Crate Root
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)] // Rule 2

//! Debug probe facade for the Dapper module host.
//!
//! A probe's CMSIS-DAP logic lives in a WebAssembly module; this crate hosts
//! that module, routes its packet I/O to a transport and exposes the probe
//! operations as plain methods.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dapper::{HostConfig, ProbeFactory};
//! use dapper::transport::{ChannelProvider, TransportRegistry};
//!
//! # fn main() -> dapper::Result<()> {
//! let mut registry = TransportRegistry::new();
//! registry.register(Arc::new(ChannelProvider::new()));
//! let factory = ProbeFactory::new(registry, HostConfig::default());
//!
//! for descriptor in factory.list_probes() {
//!     let mut probe = factory.create_probe(&descriptor.serial_no)?;
//!     probe.connect()?;
//!     let idr = probe.core_sight_read(true, 0xFC)?;
//!     println!("{} AP IDR {idr:#010x}", descriptor.serial_no);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod factory;
pub mod info;
pub mod power;
pub mod probe;

pub use dapper_error::{codes, Error, ErrorCategory, Result};
pub use dapper_host::{HostCallbacks, TraceDirection};
pub use dapper_runtime::{self as runtime, HostConfig, ModuleHost, ModuleSource, Value};
pub use dapper_transport as transport;
pub use factory::ProbeFactory;
pub use info::{ProbeInfo, NOT_AVAILABLE};
pub use power::{power_control, CoreSightAccess, PowerControlPolicy, DP_CTRL_STAT};
pub use probe::Probe;
