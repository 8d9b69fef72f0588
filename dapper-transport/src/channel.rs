// Dapper - dapper-transport
// Module: In-Process Channel Transport
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! In-process transport backed by blocking queues.
//!
//! A [`ChannelTransport`] and its [`ChannelPeer`] form a duplex pipe. The peer
//! plays the role of the probe firmware: tests and simulators receive the
//! module's packets from it and answer through it. Reads block on a queue for
//! at most the configured timeout.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
use dapper_foundation::Uint8View;
use log::{debug, trace};

use crate::{
    registry::TransportProvider,
    transport::{BackendKind, ProbeDescriptor, Transport},
};

/// Default read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Transport end of an in-process pipe.
pub struct ChannelTransport {
    descriptor: ProbeDescriptor,
    open:       bool,
    to_peer:    Sender<Vec<u8>>,
    from_peer:  Receiver<Vec<u8>>,
    timeout:    Duration,
}

/// Probe end of an in-process pipe.
pub struct ChannelPeer {
    to_transport:   Sender<Vec<u8>>,
    from_transport: Receiver<Vec<u8>>,
    timeout:        Duration,
}

fn timeout_error() -> Error {
    Error::new(ErrorCategory::Io, codes::TRANSPORT_TIMEOUT, "No data available.")
}

fn disconnected_error() -> Error {
    helpers::transport_error("channel peer disconnected")
}

impl ChannelTransport {
    /// Create a connected transport/peer pair.
    #[must_use]
    pub fn pair(descriptor: ProbeDescriptor) -> (Self, ChannelPeer) {
        let (to_peer, from_transport) = mpsc::channel();
        let (to_transport, from_peer) = mpsc::channel();
        let transport = Self {
            descriptor,
            open: false,
            to_peer,
            from_peer,
            timeout: DEFAULT_READ_TIMEOUT,
        };
        let peer = ChannelPeer {
            to_transport,
            from_transport,
            timeout: DEFAULT_READ_TIMEOUT,
        };
        (transport, peer)
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open { Ok(()) } else { Err(helpers::transport_not_open()) }
    }
}

impl Transport for ChannelTransport {
    fn descriptor(&self) -> &ProbeDescriptor {
        &self.descriptor
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<()> {
        debug!("opening channel transport {}", self.descriptor.serial_no);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        debug!("closing channel transport {}", self.descriptor.serial_no);
        self.open = false;
        Ok(())
    }

    fn write(&mut self, data: &Uint8View) -> Result<()> {
        self.ensure_open()?;
        let bytes = data.to_vec()?;
        trace!("channel write {} bytes", bytes.len());
        self.to_peer.send(bytes).map_err(|_| disconnected_error())
    }

    fn read(&mut self) -> Result<Uint8View> {
        self.ensure_open()?;
        match self.from_peer.recv_timeout(self.timeout) {
            Ok(bytes) => {
                trace!("channel read {} bytes", bytes.len());
                Ok(Uint8View::from_vec(bytes))
            }
            Err(RecvTimeoutError::Timeout) => Err(timeout_error()),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected_error()),
        }
    }
}

impl ChannelPeer {
    /// Set the timeout for [`recv`](Self::recv).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queue a packet for the transport to read.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        self.to_transport.send(bytes.to_vec()).map_err(|_| disconnected_error())
    }

    /// Wait for the next packet the transport wrote.
    pub fn recv(&self) -> Result<Vec<u8>> {
        match self.from_transport.recv_timeout(self.timeout) {
            Ok(bytes) => Ok(bytes),
            Err(RecvTimeoutError::Timeout) => Err(timeout_error()),
            Err(RecvTimeoutError::Disconnected) => Err(disconnected_error()),
        }
    }

    /// Answer packets on a worker thread until the transport goes away.
    ///
    /// `respond` sees every written packet and may queue one reply.
    pub fn serve<F>(self, mut respond: F) -> JoinHandle<()>
    where
        F: FnMut(Vec<u8>) -> Option<Vec<u8>> + Send + 'static,
    {
        thread::spawn(move || {
            while let Ok(request) = self.from_transport.recv() {
                if let Some(reply) = respond(request) {
                    if self.to_transport.send(reply).is_err() {
                        break;
                    }
                }
            }
        })
    }
}

/// Provider handing out prepared channel transports.
#[derive(Default)]
pub struct ChannelProvider {
    transports: Mutex<Vec<ChannelTransport>>,
}

impl ChannelProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a transport discoverable.
    pub fn add(&self, transport: ChannelTransport) -> Result<()> {
        self.transports
            .lock()
            .map_err(|_| helpers::poisoned_lock("channel provider"))?
            .push(transport);
        Ok(())
    }
}

impl TransportProvider for ChannelProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Channel
    }

    fn is_available(&self) -> bool {
        true
    }

    fn list_probes(&self) -> Result<Vec<ProbeDescriptor>> {
        let transports =
            self.transports.lock().map_err(|_| helpers::poisoned_lock("channel provider"))?;
        Ok(transports.iter().map(|transport| transport.descriptor.clone()).collect())
    }

    fn connect(&self, descriptor: &ProbeDescriptor) -> Result<Box<dyn Transport>> {
        let mut transports =
            self.transports.lock().map_err(|_| helpers::poisoned_lock("channel provider"))?;
        let position = transports
            .iter()
            .position(|transport| transport.descriptor.serial_no == descriptor.serial_no)
            .ok_or_else(|| probe_not_found(&descriptor.serial_no))?;
        Ok(Box::new(transports.remove(position)))
    }
}

pub(crate) fn probe_not_found(serial: &str) -> Error {
    Error::new(
        ErrorCategory::Io,
        codes::PROBE_NOT_FOUND,
        format!("no probe with serial number {serial}"),
    )
}
