// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host callbacks the hosted module reaches through its globals.
//!
//! The module sees four globals: `readData`, `writeData`, `stdout` and
//! `stderr`. Each is a typed strategy slot on [`HostCallbacks`] with a
//! default that routes to the open transport or to the console. Additional
//! extension callbacks (logging, packet tracing) are stored by
//! [`CallbackType`].

use std::{any::Any, collections::HashMap, fmt};

use dapper_error::{helpers, Result};
use dapper_foundation::Uint8View;
use dapper_transport::SharedTransport;
use log::debug;

/// Handler for `readData`: returns the next packet from the device
pub type ReadDataHandler = Box<dyn Fn() -> Result<Uint8View> + Send + Sync>;
/// Handler for `writeData`: sends one packet to the device
pub type WriteDataHandler = Box<dyn Fn(&Uint8View) -> Result<()> + Send + Sync>;
/// Handler for `stdout` and `stderr` text
pub type TextHandler = Box<dyn Fn(&str) + Send + Sync>;
/// Handler observing every packet moved by `readData`/`writeData`
pub type TraceHandler = Box<dyn Fn(TraceDirection, &[u8]) + Send + Sync>;

/// Types of extension callbacks that can be registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CallbackType {
    /// Callback for logging
    Logging,
    /// Callback for packet tracing
    Trace,
}

/// Direction of a traced packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    /// Device to module
    Inbound,
    /// Module to device
    Outbound,
}

impl TraceDirection {
    /// Name used in trace output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Strategy object holding the host side of the module's globals.
#[derive(Default)]
pub struct HostCallbacks {
    read_data:  Option<ReadDataHandler>,
    write_data: Option<WriteDataHandler>,
    stdout:     Option<TextHandler>,
    stderr:     Option<TextHandler>,
    transport:  Option<SharedTransport>,

    /// Generic callback storage for extension callbacks
    callbacks: HashMap<CallbackType, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCallbacks")
            .field("read_data", &self.read_data.is_some())
            .field("write_data", &self.write_data.is_some())
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("transport", &self.transport.is_some())
            .field("registered_callbacks", &self.callbacks.keys())
            .finish()
    }
}

impl HostCallbacks {
    /// Create callbacks with every slot at its default
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the `readData` handler
    pub fn set_read_data<F>(&mut self, handler: F)
    where
        F: Fn() -> Result<Uint8View> + Send + Sync + 'static,
    {
        self.read_data = Some(Box::new(handler));
    }

    /// Replace the `writeData` handler
    pub fn set_write_data<F>(&mut self, handler: F)
    where
        F: Fn(&Uint8View) -> Result<()> + Send + Sync + 'static,
    {
        self.write_data = Some(Box::new(handler));
    }

    /// Replace the `stdout` handler
    pub fn set_stdout<F>(&mut self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.stdout = Some(Box::new(handler));
    }

    /// Replace the `stderr` handler
    pub fn set_stderr<F>(&mut self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.stderr = Some(Box::new(handler));
    }

    /// Route the default `readData`/`writeData` through `transport`
    pub fn set_transport(&mut self, transport: SharedTransport) {
        debug!("host callbacks routed to transport");
        self.transport = Some(transport);
    }

    /// Drop the transport route
    pub fn clear_transport(&mut self) -> Option<SharedTransport> {
        self.transport.take()
    }

    /// Transport the defaults route to, if any
    #[must_use]
    pub fn transport(&self) -> Option<&SharedTransport> {
        self.transport.as_ref()
    }

    /// Fetch the next packet for the module.
    ///
    /// # Errors
    ///
    /// Without a handler or transport this fails with `TRANSPORT_NOT_OPEN`;
    /// transport errors are passed through unchanged.
    pub fn read_data(&self) -> Result<Uint8View> {
        let data = match (&self.read_data, &self.transport) {
            (Some(handler), _) => handler()?,
            (None, Some(transport)) => {
                transport.lock().map_err(|_| helpers::poisoned_lock("transport"))?.read()?
            }
            (None, None) => return Err(helpers::transport_not_open()),
        };
        self.trace(TraceDirection::Inbound, &data)?;
        Ok(data)
    }

    /// Send a packet from the module to the device.
    pub fn write_data(&self, data: &Uint8View) -> Result<()> {
        self.trace(TraceDirection::Outbound, data)?;
        match (&self.write_data, &self.transport) {
            (Some(handler), _) => handler(data),
            (None, Some(transport)) => {
                transport.lock().map_err(|_| helpers::poisoned_lock("transport"))?.write(data)
            }
            (None, None) => Err(helpers::transport_not_open()),
        }
    }

    /// Deliver module standard output.
    pub fn stdout(&self, text: &str) {
        match &self.stdout {
            Some(handler) => handler(text),
            None if text.ends_with('\n') => print!("{text}"),
            None => println!("{text}"),
        }
    }

    /// Deliver module standard error.
    pub fn stderr(&self, text: &str) {
        match &self.stderr {
            Some(handler) => handler(text),
            None => eprintln!("ERROR: {}", text.trim_end_matches('\n')),
        }
    }

    fn trace(&self, direction: TraceDirection, data: &Uint8View) -> Result<()> {
        if let Some(handler) = self.get_callback::<TraceHandler>(&CallbackType::Trace) {
            handler(direction, &data.to_vec()?);
        }
        Ok(())
    }

    /// Register a packet trace handler
    pub fn register_trace_handler<F>(&mut self, handler: F)
    where
        F: Fn(TraceDirection, &[u8]) + Send + Sync + 'static,
    {
        let handler: TraceHandler = Box::new(handler);
        self.register_callback(CallbackType::Trace, handler);
    }

    /// Register an extension callback
    pub fn register_callback<T: 'static + Send + Sync>(
        &mut self,
        callback_type: CallbackType,
        callback: T,
    ) {
        self.callbacks.insert(callback_type, Box::new(callback));
    }

    /// Get an extension callback
    #[must_use]
    pub fn get_callback<T: 'static + Send + Sync>(
        &self,
        callback_type: &CallbackType,
    ) -> Option<&T> {
        self.callbacks.get(callback_type).and_then(|cb| cb.downcast_ref())
    }

    /// Get a mutable extension callback
    pub fn get_callback_mut<T: 'static + Send + Sync>(
        &mut self,
        callback_type: &CallbackType,
    ) -> Option<&mut T> {
        self.callbacks.get_mut(callback_type).and_then(|cb| cb.downcast_mut())
    }

    /// Whether an extension callback is registered
    #[must_use]
    pub fn has_callback(&self, callback_type: &CallbackType) -> bool {
        self.callbacks.contains_key(callback_type)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use dapper_error::codes;
    use dapper_transport::{share, BackendKind, ChannelTransport, ProbeDescriptor, Transport};

    use super::*;

    #[test]
    fn test_defaults_without_transport_fail() {
        let callbacks = HostCallbacks::new();
        let err = callbacks.read_data().unwrap_err();
        assert_eq!(err.code, codes::TRANSPORT_NOT_OPEN);
        assert_eq!(err.message, "Device interface needs to be opened first.");
        let err = callbacks.write_data(&Uint8View::from_slice(&[1])).unwrap_err();
        assert_eq!(err.code, codes::TRANSPORT_NOT_OPEN);
    }

    #[test]
    fn test_custom_handlers_win() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = written.clone();
        let mut callbacks = HostCallbacks::new();
        callbacks.set_read_data(|| Ok(Uint8View::from_slice(&[7, 7])));
        callbacks.set_write_data(move |data| {
            sink.lock().unwrap().extend(data.to_vec()?);
            Ok(())
        });
        assert_eq!(callbacks.read_data().unwrap().to_vec().unwrap(), vec![7, 7]);
        callbacks.write_data(&Uint8View::from_slice(&[1, 2])).unwrap();
        assert_eq!(*written.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_transport_route() {
        let descriptor = ProbeDescriptor::new(BackendKind::Channel, 0x1FC9, 1, "T");
        let (mut transport, peer) = ChannelTransport::pair(descriptor);
        transport.open().unwrap();
        let mut callbacks = HostCallbacks::new();
        callbacks.set_transport(share(Box::new(transport)));
        callbacks.write_data(&Uint8View::from_slice(&[0x11])).unwrap();
        assert_eq!(peer.recv().unwrap(), vec![0x11]);
        peer.send(&[0x22]).unwrap();
        assert_eq!(callbacks.read_data().unwrap().to_vec().unwrap(), vec![0x22]);
        assert!(callbacks.clear_transport().is_some());
        assert!(callbacks.transport().is_none());
    }

    #[test]
    fn test_text_handlers() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let out = lines.clone();
        let err = lines.clone();
        let mut callbacks = HostCallbacks::new();
        callbacks.set_stdout(move |text| out.lock().unwrap().push(format!("out:{text}")));
        callbacks.set_stderr(move |text| err.lock().unwrap().push(format!("err:{text}")));
        callbacks.stdout("hello");
        callbacks.stderr("bad");
        assert_eq!(*lines.lock().unwrap(), vec!["out:hello".to_string(), "err:bad".to_string()]);
    }

    #[test]
    fn test_trace_sees_both_directions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut callbacks = HostCallbacks::new();
        callbacks.set_read_data(|| Ok(Uint8View::from_slice(&[2])));
        callbacks.set_write_data(|_| Ok(()));
        callbacks.register_trace_handler(move |direction, bytes| {
            sink.lock().unwrap().push((direction, bytes.to_vec()));
        });
        assert!(callbacks.has_callback(&CallbackType::Trace));
        callbacks.write_data(&Uint8View::from_slice(&[1])).unwrap();
        callbacks.read_data().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(TraceDirection::Outbound, vec![1]), (TraceDirection::Inbound, vec![2])]
        );
    }
}
