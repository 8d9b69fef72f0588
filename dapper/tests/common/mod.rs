// Dapper - dapper
// Module: Test Fixtures
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! A hand-written stand-in for the probe firmware module.
//!
//! Registers live in linear memory at `1024 + ap * 256 + address`. Writing
//! DP `CTRL/STAT` acknowledges whichever power-up requests the written word
//! carries. `connect` and `reset` bump counters exported as
//! `connect_count` and `reset_count`.
//!
//! Raw type ids: `void` 1000, `bool` 1001, `int` 1024, `unsigned int` 1025,
//! `emscripten::val` 3000, `memory_view<unsigned short>` 4001.

#![allow(dead_code)]

use dapper::{HostConfig, ModuleHost, Probe};
use dapper::transport::{BackendKind, ChannelPeer, ChannelTransport, ProbeDescriptor, NXP_VENDOR_ID};

pub const PROBE_MODULE: &str = r#"
(module
  (import "env" "_embind_register_void" (func $reg_void (param i32 i32)))
  (import "env" "_embind_register_bool" (func $reg_bool (param i32 i32 i32 i32 i32)))
  (import "env" "_embind_register_integer" (func $reg_int (param i32 i32 i32 i32 i32)))
  (import "env" "_embind_register_emval" (func $reg_emval (param i32 i32)))
  (import "env" "_embind_register_memory_view" (func $reg_view (param i32 i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (table 16 funcref)
  (elem (i32.const 1) $invoke_v $connect $reset $invoke_read $cs_read $invoke_write $cs_write $invoke_ret $info $vids)
  (type $v (func))
  (type $ii_i (func (param i32 i32) (result i32)))
  (type $iii_v (func (param i32 i32 i32)))
  (type $r_i (func (result i32)))
  (type $i_v (func (param i32)))
  (type $i_i (func (param i32) (result i32)))
  (type $iii_i (func (param i32 i32 i32) (result i32)))
  (type $iiii_v (func (param i32 i32 i32 i32)))
  (data (i32.const 16) "void\00")
  (data (i32.const 24) "bool\00")
  (data (i32.const 32) "int\00")
  (data (i32.const 40) "unsigned int\00")
  (data (i32.const 56) "emscripten::memory_view<unsigned short>\00")
  (data (i32.const 96) "connect\00")
  (data (i32.const 104) "reset\00")
  (data (i32.const 112) "coreSightRead\00")
  (data (i32.const 128) "coreSightWrite\00")
  (data (i32.const 144) "getProbeDAPInfo\00")
  (data (i32.const 160) "getSupportedVendorIDs\00")
  (data (i32.const 184) "vi\00")
  (data (i32.const 188) "iiii\00")
  (data (i32.const 196) "viiii\00")
  (data (i32.const 204) "ii\00")
  (data (i32.const 256) "\e8\03\00\00")
  (data (i32.const 260) "\01\04\00\00\e9\03\00\00\00\04\00\00")
  (data (i32.const 272) "\e8\03\00\00\e9\03\00\00\00\04\00\00\01\04\00\00")
  (data (i32.const 288) "\b8\0b\00\00")
  (data (i32.const 292) "\a1\0f\00\00")
  (data (i32.const 600) "\02\00\00\00\60\02\00\00")
  (data (i32.const 608) "\c9\1f\28\0d")
  (func $reg_addr (param $ap i32) (param $addr i32) (result i32)
    (i32.add (i32.const 1024)
      (i32.add (i32.mul (local.get $ap) (i32.const 256)) (local.get $addr))))
  (func $connect
    (i32.store (i32.const 700) (i32.add (i32.load (i32.const 700)) (i32.const 1))))
  (func $reset
    (i32.store (i32.const 704) (i32.add (i32.load (i32.const 704)) (i32.const 1))))
  (func $cs_read (param $ap i32) (param $addr i32) (result i32)
    (i32.load (call $reg_addr (local.get $ap) (local.get $addr))))
  (func $cs_write (param $ap i32) (param $addr i32) (param $data i32)
    (if (i32.and (i32.eqz (local.get $ap)) (i32.eq (local.get $addr) (i32.const 4)))
      (then
        (local.set $data
          (i32.or (local.get $data)
            (i32.shl (i32.and (local.get $data) (i32.const 0x50000000)) (i32.const 1))))))
    (i32.store (call $reg_addr (local.get $ap) (local.get $addr)) (local.get $data)))
  (func $info (result i32)
    (i32.const 2))
  (func $vids (result i32)
    (i32.const 600))
  (func $invoke_v (param $fn i32)
    (call_indirect (type $v) (local.get $fn)))
  (func $invoke_read (param $fn i32) (param i32 i32) (result i32)
    (call_indirect (type $ii_i) (local.get 1) (local.get 2) (local.get $fn)))
  (func $invoke_write (param $fn i32) (param i32 i32 i32)
    (call_indirect (type $iii_v) (local.get 1) (local.get 2) (local.get 3) (local.get $fn)))
  (func $invoke_ret (param $fn i32) (result i32)
    (call_indirect (type $r_i) (local.get $fn)))
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $i_v) (local.get 1) (local.get $idx)))
  (func (export "dynCall_ii") (param $idx i32) (param i32) (result i32)
    (call_indirect (type $i_i) (local.get 1) (local.get $idx)))
  (func (export "dynCall_iiii") (param $idx i32) (param i32 i32 i32) (result i32)
    (call_indirect (type $iii_i) (local.get 1) (local.get 2) (local.get 3) (local.get $idx)))
  (func (export "dynCall_viiii") (param $idx i32) (param i32 i32 i32 i32)
    (call_indirect (type $iiii_v) (local.get 1) (local.get 2) (local.get 3) (local.get 4) (local.get $idx)))
  (func (export "connect_count") (result i32)
    (i32.load (i32.const 700)))
  (func (export "reset_count") (result i32)
    (i32.load (i32.const 704)))
  (func (export "__wasm_call_ctors")
    (call $reg_void (i32.const 1000) (i32.const 16))
    (call $reg_bool (i32.const 1001) (i32.const 24) (i32.const 1) (i32.const 1) (i32.const 0))
    (call $reg_int (i32.const 1024) (i32.const 32) (i32.const 4) (i32.const -2147483648) (i32.const 2147483647))
    (call $reg_int (i32.const 1025) (i32.const 40) (i32.const 4) (i32.const 0) (i32.const -1))
    (call $reg_emval (i32.const 3000) (i32.const 0))
    (call $reg_view (i32.const 4001) (i32.const 3) (i32.const 56))
    (call $reg_fn (i32.const 96) (i32.const 1) (i32.const 256) (i32.const 184) (i32.const 1) (i32.const 2) (i32.const 0))
    (call $reg_fn (i32.const 104) (i32.const 1) (i32.const 256) (i32.const 184) (i32.const 1) (i32.const 3) (i32.const 0))
    (call $reg_fn (i32.const 112) (i32.const 3) (i32.const 260) (i32.const 188) (i32.const 4) (i32.const 5) (i32.const 0))
    (call $reg_fn (i32.const 128) (i32.const 4) (i32.const 272) (i32.const 196) (i32.const 6) (i32.const 7) (i32.const 0))
    (call $reg_fn (i32.const 144) (i32.const 1) (i32.const 288) (i32.const 204) (i32.const 8) (i32.const 9) (i32.const 0))
    (call $reg_fn (i32.const 160) (i32.const 1) (i32.const 292) (i32.const 204) (i32.const 8) (i32.const 10) (i32.const 0))))
"#;

/// Compiled probe module
pub fn probe_module_bytes() -> Vec<u8> {
    wat::parse_str(PROBE_MODULE).unwrap()
}

/// A ready probe without a transport
pub fn probe() -> Probe {
    let host = ModuleHost::from_bytes(probe_module_bytes(), HostConfig::default());
    Probe::new(host).unwrap()
}

/// Channel transport for the serial `serial_no`
pub fn channel(serial_no: &str) -> (ChannelTransport, ChannelPeer) {
    let descriptor = ProbeDescriptor::new(BackendKind::Channel, NXP_VENDOR_ID, 0x0143, serial_no)
        .with_names("NXP", "MCU-LINK");
    ChannelTransport::pair(descriptor)
}
