//! Discovery and connection through the registry with channel backends

use std::sync::Arc;

use dapper_foundation::Uint8View;
use dapper_transport::{
    BackendKind, ChannelProvider, ChannelTransport, ProbeDescriptor, TransportRegistry,
    NXP_VENDOR_ID,
};

#[test]
fn test_connect_by_serial_and_exchange_bytes() {
    let provider = Arc::new(ChannelProvider::new());
    let descriptor = ProbeDescriptor::new(BackendKind::Channel, NXP_VENDOR_ID, 0x0143, "SN-1")
        .with_names("NXP", "MCU-LINK");
    let (transport, peer) = ChannelTransport::pair(descriptor);
    provider.add(transport).unwrap();

    let mut registry = TransportRegistry::new();
    registry.register(provider);

    let probes = registry.list_probes();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].description(), "NXP MCU-LINK");

    let mut transport = registry.connect("SN-1").unwrap();
    transport.open().unwrap();
    transport.write(&Uint8View::from_slice(&[0x02])).unwrap();
    assert_eq!(peer.recv().unwrap(), vec![0x02]);
    peer.send(&[0x02, 0x00]).unwrap();
    assert_eq!(transport.read().unwrap().to_vec().unwrap(), vec![0x02, 0x00]);
    transport.close().unwrap();
    assert!(!transport.is_open());
}
