// Dapper - dapper
// Module: Probe Factory
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Discovery and construction of probes.

use dapper_error::Result;
use dapper_runtime::HostConfig;
use dapper_transport::{ProbeDescriptor, TransportRegistry};
use log::info;

use crate::{power::PowerControlPolicy, probe::Probe};

/// Builds [`Probe`]s from a transport registry and one host configuration.
///
/// Each probe gets its own module host, so probes never share module state.
#[derive(Clone, Default)]
pub struct ProbeFactory {
    registry:     TransportRegistry,
    config:       HostConfig,
    power_policy: PowerControlPolicy,
}

impl ProbeFactory {
    /// Create a factory.
    #[must_use]
    pub fn new(registry: TransportRegistry, config: HostConfig) -> Self {
        Self {
            registry,
            config,
            power_policy: PowerControlPolicy::default(),
        }
    }

    /// Power policy handed to every probe.
    #[must_use]
    pub fn with_power_policy(mut self, policy: PowerControlPolicy) -> Self {
        self.power_policy = policy;
        self
    }

    /// Transport registry
    #[must_use]
    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    /// Host configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Attached probes, one entry per serial number.
    #[must_use]
    pub fn list_probes(&self) -> Vec<ProbeDescriptor> {
        self.registry.list_probes()
    }

    /// Connect and open the probe with `serial_no`.
    ///
    /// # Errors
    ///
    /// Returns `PROBE_NOT_FOUND` for an unknown serial number, module load
    /// and initialization errors, and whatever opening the probe reports.
    pub fn create_probe(&self, serial_no: &str) -> Result<Probe> {
        let transport = self.registry.connect(serial_no)?;
        let mut probe = Probe::from_config(self.config.clone())?.with_power_policy(self.power_policy);
        let probe_info = probe.open(transport)?;
        info!("probe {serial_no} opened, firmware {}", probe_info.firmware_version);
        Ok(probe)
    }
}
