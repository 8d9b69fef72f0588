// Dapper - dapper-transport
// Module: Transport Registry
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Ranked discovery across transport backends.
//!
//! Providers are registered explicitly. Discovery walks the available
//! providers from best to worst priority and keeps the first sighting of each
//! serial number, so a probe reachable over several backends is reported once,
//! under its preferred backend.

use std::{collections::HashSet, sync::Arc};

use dapper_error::Result;
use log::{debug, warn};

use crate::{
    channel::probe_not_found,
    transport::{BackendKind, ProbeDescriptor, Transport},
};

/// A backend able to enumerate and connect probes.
pub trait TransportProvider: Send + Sync {
    /// Backend kind
    fn kind(&self) -> BackendKind;

    /// Ranking; lower is preferred
    fn priority(&self) -> u32 {
        self.kind().default_priority()
    }

    /// Whether the backend can run on this host
    fn is_available(&self) -> bool;

    /// Enumerate attached probes.
    fn list_probes(&self) -> Result<Vec<ProbeDescriptor>>;

    /// Build a transport for a probe this provider listed.
    fn connect(&self, descriptor: &ProbeDescriptor) -> Result<Box<dyn Transport>>;
}

/// Explicitly populated, priority-ordered set of providers.
#[derive(Default, Clone)]
pub struct TransportRegistry {
    providers: Vec<Arc<dyn TransportProvider>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider.
    pub fn register(&mut self, provider: Arc<dyn TransportProvider>) {
        debug!("registering {} transport provider", provider.kind());
        self.providers.push(provider);
    }

    /// Available providers, best first. Ties keep registration order.
    #[must_use]
    pub fn available(&self) -> Vec<Arc<dyn TransportProvider>> {
        let mut available: Vec<_> = self
            .providers
            .iter()
            .filter(|provider| provider.is_available())
            .cloned()
            .collect();
        available.sort_by_key(|provider| provider.priority());
        available
    }

    /// Enumerate probes across providers, one entry per serial number.
    ///
    /// A provider that fails to enumerate is logged and skipped.
    pub fn list_probes(&self) -> Vec<ProbeDescriptor> {
        let mut seen = HashSet::new();
        let mut probes = Vec::new();
        for provider in self.available() {
            match provider.list_probes() {
                Ok(found) => {
                    for probe in found {
                        if seen.insert(probe.serial_no.clone()) {
                            probes.push(probe);
                        }
                    }
                }
                Err(err) => warn!("{} provider failed to list probes: {err}", provider.kind()),
            }
        }
        probes
    }

    /// Connect the probe with `serial_no` through its best-ranked backend.
    ///
    /// # Errors
    ///
    /// Returns `PROBE_NOT_FOUND` when no available provider lists the serial.
    pub fn connect(&self, serial_no: &str) -> Result<Box<dyn Transport>> {
        for provider in self.available() {
            let Ok(found) = provider.list_probes() else {
                continue;
            };
            if let Some(descriptor) = found.iter().find(|probe| probe.serial_no == serial_no) {
                return provider.connect(descriptor);
            }
        }
        Err(probe_not_found(serial_no))
    }
}

#[cfg(test)]
mod tests {
    use dapper_error::codes;

    use super::*;
    use crate::{
        channel::{ChannelProvider, ChannelTransport},
        transport::NXP_VENDOR_ID,
    };

    struct FixedProvider {
        kind:      BackendKind,
        available: bool,
        serials:   Vec<&'static str>,
    }

    impl TransportProvider for FixedProvider {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn list_probes(&self) -> Result<Vec<ProbeDescriptor>> {
            Ok(self
                .serials
                .iter()
                .map(|serial| ProbeDescriptor::new(self.kind, NXP_VENDOR_ID, 1, *serial))
                .collect())
        }

        fn connect(&self, descriptor: &ProbeDescriptor) -> Result<Box<dyn Transport>> {
            let (transport, _peer) = ChannelTransport::pair(descriptor.clone());
            Ok(Box::new(transport))
        }
    }

    #[test]
    fn test_available_sorted_and_filtered() {
        let mut registry = TransportRegistry::new();
        registry.register(Arc::new(FixedProvider {
            kind:      BackendKind::UsbV1,
            available: true,
            serials:   vec![],
        }));
        registry.register(Arc::new(FixedProvider {
            kind:      BackendKind::Hid,
            available: false,
            serials:   vec![],
        }));
        registry.register(Arc::new(FixedProvider {
            kind:      BackendKind::UsbV2,
            available: true,
            serials:   vec![],
        }));
        let kinds: Vec<_> = registry.available().iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![BackendKind::UsbV2, BackendKind::UsbV1]);
    }

    #[test]
    fn test_list_probes_deduplicates_by_serial() {
        let mut registry = TransportRegistry::new();
        registry.register(Arc::new(FixedProvider {
            kind:      BackendKind::UsbV1,
            available: true,
            serials:   vec!["A", "B"],
        }));
        registry.register(Arc::new(FixedProvider {
            kind:      BackendKind::UsbV2,
            available: true,
            serials:   vec!["B", "C"],
        }));
        let probes = registry.list_probes();
        let summary: Vec<_> = probes.iter().map(|p| (p.serial_no.as_str(), p.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("B", BackendKind::UsbV2),
                ("C", BackendKind::UsbV2),
                ("A", BackendKind::UsbV1),
            ]
        );
    }

    #[test]
    fn test_connect_unknown_serial() {
        let mut registry = TransportRegistry::new();
        registry.register(Arc::new(ChannelProvider::new()));
        let err = registry.connect("missing").err().unwrap();
        assert_eq!(err.code, codes::PROBE_NOT_FOUND);
    }
}
