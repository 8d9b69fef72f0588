// Dapper - dapper
// Module: Probe
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A debug probe driven through its hosted firmware module.
//!
//! [`Probe`] owns one ready [`ModuleHost`] and, while open, the transport the
//! module's `readData`/`writeData` globals are routed to. Every operation is
//! a call into the module's exported embind functions.

use std::fmt;

use dapper_error::{helpers, Result};
use dapper_runtime::{HostConfig, ModuleHost, Value};
use dapper_transport::{share, SharedTransport, Transport};
use log::{debug, info};

use crate::{
    info::ProbeInfo,
    power::{power_control, CoreSightAccess, PowerControlPolicy},
};

/// Embind function names the probe module exports
mod exports {
    pub const CONNECT: &str = "connect";
    pub const RESET: &str = "reset";
    pub const CORE_SIGHT_READ: &str = "coreSightRead";
    pub const CORE_SIGHT_WRITE: &str = "coreSightWrite";
    pub const PROBE_DAP_INFO: &str = "getProbeDAPInfo";
    pub const SUPPORTED_VENDOR_IDS: &str = "getSupportedVendorIDs";
}

/// One debug probe.
pub struct Probe {
    host:         ModuleHost,
    transport:    Option<SharedTransport>,
    power_policy: PowerControlPolicy,
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("host", &self.host)
            .field("open", &self.transport.is_some())
            .field("power_policy", &self.power_policy)
            .finish()
    }
}

impl Probe {
    /// Wrap `host`, initializing it first if needed.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ModuleHost::initialize`] reports.
    pub fn new(mut host: ModuleHost) -> Result<Self> {
        if !host.is_ready() {
            host.initialize()?;
        }
        Ok(Self {
            host,
            transport: None,
            power_policy: PowerControlPolicy::default(),
        })
    }

    /// Load and initialize the module named by `config`.
    pub fn from_config(config: HostConfig) -> Result<Self> {
        Self::new(ModuleHost::new(config)?)
    }

    /// Replace the power acknowledge policy.
    #[must_use]
    pub fn with_power_policy(mut self, policy: PowerControlPolicy) -> Self {
        self.power_policy = policy;
        self
    }

    /// The hosted module
    #[must_use]
    pub fn host(&self) -> &ModuleHost {
        &self.host
    }

    /// The hosted module, for raw calls and callback changes
    pub fn host_mut(&mut self) -> &mut ModuleHost {
        &mut self.host
    }

    /// Whether a transport is attached
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Attach and open `transport`, then read the probe's identity.
    ///
    /// A transport that was already attached is closed first.
    ///
    /// # Errors
    ///
    /// Returns the transport's open error, or whatever `getProbeDAPInfo`
    /// raises. The transport stays attached in the latter case.
    pub fn open(&mut self, transport: Box<dyn Transport>) -> Result<ProbeInfo> {
        self.close()?;
        let shared = share(transport);
        {
            let mut device = shared.lock().map_err(|_| helpers::poisoned_lock("transport"))?;
            info!("opening probe {} ({})", device.probe_id(), device.description());
            device.open()?;
        }
        self.host.callbacks_mut().set_transport(shared.clone());
        self.transport = Some(shared);
        self.probe_info()
    }

    /// Detach and close the transport. Closing a closed probe does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.host.callbacks_mut().clear_transport();
        let Some(transport) = self.transport.take() else {
            return Ok(());
        };
        let mut device = transport.lock().map_err(|_| helpers::poisoned_lock("transport"))?;
        debug!("closing probe {}", device.probe_id());
        device.close()
    }

    /// Serial number of the attached probe.
    ///
    /// # Errors
    ///
    /// Returns `TRANSPORT_NOT_OPEN` when no transport is attached.
    pub fn probe_id(&self) -> Result<String> {
        let transport = self.transport.as_ref().ok_or_else(helpers::transport_not_open)?;
        let device = transport.lock().map_err(|_| helpers::poisoned_lock("transport"))?;
        Ok(device.probe_id().to_string())
    }

    /// Identity block reported by the firmware.
    pub fn probe_info(&mut self) -> Result<ProbeInfo> {
        let value = self.host.call(exports::PROBE_DAP_INFO, &[])?;
        Ok(ProbeInfo::from_value(&value))
    }

    /// USB vendor ids the firmware knows how to drive.
    ///
    /// # Errors
    ///
    /// Returns `TYPE_MISMATCH` when the module returns something other than
    /// a list of 16-bit ids.
    pub fn supported_vendor_ids(&mut self) -> Result<Vec<u16>> {
        let value = self.host.call(exports::SUPPORTED_VENDOR_IDS, &[])?;
        self.host
            .array_elements(&value)?
            .iter()
            .map(|element| {
                element
                    .as_i64()
                    .and_then(|id| u16::try_from(id).ok())
                    .ok_or_else(|| helpers::type_mismatch(format!("{element} is not a vendor id")))
            })
            .collect()
    }

    /// Attach to the target and power up its system and debug domains.
    pub fn connect(&mut self) -> Result<()> {
        self.host.call(exports::CONNECT, &[])?;
        self.power_control(true)?;
        self.host.callbacks().stdout("System Power True");
        self.power_control(false)?;
        self.host.callbacks().stdout("Debug Power True");
        Ok(())
    }

    /// Request system or debug power using the probe's policy.
    pub fn power_control(&mut self, sys_power: bool) -> Result<()> {
        let policy = self.power_policy;
        power_control(self, sys_power, &policy)
    }

    /// Reset the target.
    pub fn reset(&mut self) -> Result<()> {
        self.host.call(exports::RESET, &[])?;
        Ok(())
    }

    /// Read a DP or AP register.
    pub fn core_sight_read(&mut self, access_port: bool, address: u32) -> Result<u32> {
        let value = self.host.call(
            exports::CORE_SIGHT_READ,
            &[Value::Bool(access_port), Value::Int(address.into())],
        )?;
        let raw = value
            .as_i64()
            .ok_or_else(|| helpers::type_mismatch(format!("{} is not a register value", value.type_name())))?;
        let data = (raw & 0xFFFF_FFFF) as u32;
        debug!("coresight read ap={access_port} address={address:#x} data={data:#010x}");
        Ok(data)
    }

    /// Write a DP or AP register.
    pub fn core_sight_write(&mut self, access_port: bool, address: u32, data: u32) -> Result<()> {
        debug!("coresight write ap={access_port} address={address:#x} data={data:#010x}");
        self.host.call(
            exports::CORE_SIGHT_WRITE,
            &[Value::Bool(access_port), Value::Int(address.into()), Value::Int(data.into())],
        )?;
        Ok(())
    }
}

impl CoreSightAccess for Probe {
    fn core_sight_read(&mut self, access_port: bool, address: u32) -> Result<u32> {
        Probe::core_sight_read(self, access_port, address)
    }

    fn core_sight_write(&mut self, access_port: bool, address: u32, data: u32) -> Result<()> {
        Probe::core_sight_write(self, access_port, address, data)
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!("closing probe on drop failed: {err}");
        }
    }
}
