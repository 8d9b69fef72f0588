// Dapper - dapper-transport
// Module: Transport Trait
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The byte pipe between the hosted module and a physical probe.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use dapper_error::Result;
use dapper_foundation::Uint8View;

/// NXP Semiconductors USB vendor id
pub const NXP_VENDOR_ID: u16 = 0x1FC9;
/// Arm Ltd USB vendor id
pub const ARM_VENDOR_ID: u16 = 0x0D28;
/// Vendor ids probes are discovered under
pub const SUPPORTED_VENDOR_IDS: [u16; 2] = [NXP_VENDOR_ID, ARM_VENDOR_ID];

/// Kind of backend a transport is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// USB HID reports
    Hid,
    /// CMSIS-DAP v1 over USB bulk endpoints
    UsbV1,
    /// CMSIS-DAP v2 over USB bulk endpoints
    UsbV2,
    /// In-process channel, used for simulation and tests
    Channel,
}

impl BackendKind {
    /// Default ranking of the backend; lower is preferred.
    ///
    /// HID is only preferred on hosts where the bulk backends need extra
    /// drivers.
    #[must_use]
    pub fn default_priority(self) -> u32 {
        match self {
            Self::UsbV2 => 1,
            Self::Hid if cfg!(any(target_os = "macos", target_os = "windows")) => 3,
            Self::UsbV1 => 5,
            Self::Hid => 10,
            Self::Channel => 20,
        }
    }

    /// Short name used in logs and listings
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hid => "hid",
            Self::UsbV1 => "usb-v1",
            Self::UsbV2 => "usb-v2",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a discovered probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeDescriptor {
    /// Backend that found the probe
    pub kind:        BackendKind,
    /// USB vendor id
    pub vid:         u16,
    /// USB product id
    pub pid:         u16,
    /// Vendor string
    pub vendor:      String,
    /// Product string
    pub product:     String,
    /// Serial number, the probe's identity across backends
    pub serial_no:   String,
    /// Largest packet the backend moves in one transfer
    pub packet_size: usize,
}

impl ProbeDescriptor {
    /// Create a descriptor with a 64-byte packet size.
    #[must_use]
    pub fn new(kind: BackendKind, vid: u16, pid: u16, serial_no: impl Into<String>) -> Self {
        Self {
            kind,
            vid,
            pid,
            vendor: String::new(),
            product: String::new(),
            serial_no: serial_no.into(),
            packet_size: 64,
        }
    }

    /// Set vendor and product strings.
    #[must_use]
    pub fn with_names(mut self, vendor: impl Into<String>, product: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self.product = product.into();
        self
    }

    /// Human readable "vendor product" description
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} {}", self.vendor, self.product)
    }
}

/// A byte pipe to one probe.
///
/// Reads and writes are only valid between [`open`](Transport::open) and
/// [`close`](Transport::close); outside that window they fail with
/// `TRANSPORT_NOT_OPEN`.
pub trait Transport: Send {
    /// Identity of the probe behind this transport
    fn descriptor(&self) -> &ProbeDescriptor;

    /// Whether the transport is open
    fn is_open(&self) -> bool;

    /// Open the device.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the device cannot be claimed.
    fn open(&mut self) -> Result<()>;

    /// Release the device.
    fn close(&mut self) -> Result<()>;

    /// Send one packet.
    fn write(&mut self, data: &Uint8View) -> Result<()>;

    /// Receive one packet, blocking up to the backend's timeout.
    fn read(&mut self) -> Result<Uint8View>;

    /// Probe identity, the serial number
    fn probe_id(&self) -> &str {
        &self.descriptor().serial_no
    }

    /// Human readable description
    fn description(&self) -> String {
        self.descriptor().description()
    }
}

/// Transport shared between the probe facade and the host callbacks.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Wrap a transport for sharing.
#[must_use]
pub fn share(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_backends_rank_ahead_of_channel() {
        assert!(BackendKind::UsbV2.default_priority() < BackendKind::UsbV1.default_priority());
        assert!(BackendKind::UsbV1.default_priority() < BackendKind::Channel.default_priority());
        assert!(BackendKind::Hid.default_priority() < BackendKind::Channel.default_priority());
    }

    #[test]
    fn test_hid_priority_depends_on_host() {
        let expected = if cfg!(any(target_os = "macos", target_os = "windows")) { 3 } else { 10 };
        assert_eq!(BackendKind::Hid.default_priority(), expected);
    }

    #[test]
    fn test_description() {
        let descriptor = ProbeDescriptor::new(BackendKind::UsbV2, NXP_VENDOR_ID, 0x0143, "ABC")
            .with_names("NXP", "MCU-LINK");
        assert_eq!(descriptor.description(), "NXP MCU-LINK");
        assert_eq!(descriptor.packet_size, 64);
    }
}
