// Dapper - dapper-transport
// Module: Device Transports
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Device transport abstraction for the Dapper module host.
//!
//! The hosted module talks to a debug probe through two host callbacks,
//! `readData` and `writeData`. Both end up on a [`Transport`]. Backends are
//! discovered through [`TransportProvider`]s collected in a
//! [`TransportRegistry`]; an in-process [`ChannelTransport`] is provided for
//! simulation and tests.

#![forbid(unsafe_code)] // Rule 2
#![warn(clippy::pedantic)]
#![deny(missing_docs)]

pub mod channel;
pub mod registry;
pub mod transport;

pub use channel::{ChannelPeer, ChannelProvider, ChannelTransport, DEFAULT_READ_TIMEOUT};
pub use registry::{TransportProvider, TransportRegistry};
pub use transport::{
    share, BackendKind, ProbeDescriptor, SharedTransport, Transport, ARM_VENDOR_ID,
    NXP_VENDOR_ID, SUPPORTED_VENDOR_IDS,
};
