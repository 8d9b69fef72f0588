// Dapper - dapper-runtime
// Module: Test Fixtures
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Hand-written modules shaped like emscripten output.
//!
//! Raw type ids used throughout: `void` 1000, `bool` 1001, `int` 1024, `Pair` 2048,
//! `emscripten::val` 3000, `memory_view<unsigned char>` 4000.

#![allow(dead_code)]

use dapper_runtime::{HostConfig, ModuleHost};

/// `add(int, int) -> int`, `add_via_invoke(int, int) -> int` and `later()`,
/// whose return type is never registered.
pub const ADD_MODULE: &str = r#"
(module
  (import "env" "_embind_register_integer" (func $reg_int (param i32 i32 i32 i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (import "env" "invoke_iii" (func $invoke_iii (param i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (table 8 funcref)
  (elem (i32.const 1) $add $invoke_add $add_via_invoke)
  (type $iii (func (param i32 i32) (result i32)))
  (type $iiii (func (param i32 i32 i32) (result i32)))
  (data (i32.const 16) "int\00")
  (data (i32.const 32) "add(a, b)\00")
  (data (i32.const 48) "iiii\00")
  (data (i32.const 56) "add_via_invoke\00")
  (data (i32.const 72) "later\00")
  (data (i32.const 80) "\00\04\00\00\00\04\00\00\00\04\00\00")
  (data (i32.const 96) "\00\50\00\00")
  (func $add (param i32 i32) (result i32)
    (i32.add (local.get 0) (local.get 1)))
  (func $invoke_add (param $fn i32) (param i32 i32) (result i32)
    (call_indirect (type $iii) (local.get 1) (local.get 2) (local.get $fn)))
  (func $add_via_invoke (param i32 i32) (result i32)
    (call $invoke_iii (i32.const 1) (local.get 0) (local.get 1)))
  (func (export "dynCall_iii") (param $idx i32) (param i32 i32) (result i32)
    (call_indirect (type $iii) (local.get 1) (local.get 2) (local.get $idx)))
  (func (export "dynCall_iiii") (param $idx i32) (param i32 i32 i32) (result i32)
    (call_indirect (type $iiii) (local.get 1) (local.get 2) (local.get 3) (local.get $idx)))
  (func (export "__wasm_call_ctors")
    (call $reg_int (i32.const 1024) (i32.const 16) (i32.const 4) (i32.const -2147483648) (i32.const 2147483647))
    (call $reg_fn (i32.const 32) (i32.const 3) (i32.const 80) (i32.const 48) (i32.const 2) (i32.const 1) (i32.const 0))
    (call $reg_fn (i32.const 56) (i32.const 3) (i32.const 80) (i32.const 48) (i32.const 2) (i32.const 3) (i32.const 0))
    (call $reg_fn (i32.const 72) (i32.const 1) (i32.const 96) (i32.const 48) (i32.const 2) (i32.const 1) (i32.const 0))))
"#;

/// Value object `Pair { a: int, b: int, on: bool }`, `swap(Pair) -> Pair`
/// and `broken() -> Pair`, whose object traps in the getter.
///
/// The struct and the functions are registered before `int` and `bool`, so
/// they wait on them. The destructor records its pointer for `last_deleted`.
pub const PAIR_MODULE: &str = r#"
(module
  (import "env" "_embind_register_integer" (func $reg_int (param i32 i32 i32 i32 i32)))
  (import "env" "_embind_register_bool" (func $reg_bool (param i32 i32 i32 i32)))
  (import "env" "_embind_register_value_object" (func $reg_obj (param i32 i32 i32 i32 i32 i32)))
  (import "env" "_embind_register_value_object_field"
    (func $reg_field (param i32 i32 i32 i32 i32 i32 i32 i32 i32 i32)))
  (import "env" "_embind_finalize_value_object" (func $fin_obj (param i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (table 10 funcref)
  (elem (i32.const 1) $pair_new $pair_delete $get $set $swap $invoke_swap $broken $invoke_broken)
  (type $t_i (func (result i32)))
  (type $t_vi (func (param i32)))
  (type $t_ii (func (param i32) (result i32)))
  (type $t_iii (func (param i32 i32) (result i32)))
  (type $t_viii (func (param i32 i32 i32)))
  (data (i32.const 16) "int\00")
  (data (i32.const 24) "Pair\00")
  (data (i32.const 32) "a\00")
  (data (i32.const 36) "b\00")
  (data (i32.const 40) "i\00")
  (data (i32.const 44) "vi\00")
  (data (i32.const 48) "iii\00")
  (data (i32.const 56) "viii\00")
  (data (i32.const 64) "swap\00")
  (data (i32.const 72) "\00\08\00\00\00\08\00\00")
  (data (i32.const 80) "bool\00")
  (data (i32.const 88) "on\00")
  (data (i32.const 92) "ii\00")
  (data (i32.const 96) "broken\00")
  (data (i32.const 104) "\00\08\00\00")
  (func $pair_new (result i32) (i32.const 256))
  (func $pair_delete (param i32)
    (i32.store (i32.const 1020) (local.get 0)))
  (func $get (param $offset i32) (param $ptr i32) (result i32)
    (if (i32.eq (local.get $ptr) (i32.const 768)) (then unreachable))
    (i32.load (i32.add (local.get $ptr) (local.get $offset))))
  (func $set (param $offset i32) (param $ptr i32) (param $value i32)
    (i32.store (i32.add (local.get $ptr) (local.get $offset)) (local.get $value)))
  (func $swap (param $ptr i32) (result i32)
    (i32.store (i32.const 512) (i32.load offset=4 (local.get $ptr)))
    (i32.store (i32.const 516) (i32.load (local.get $ptr)))
    (i32.store (i32.const 520) (i32.load offset=8 (local.get $ptr)))
    (i32.const 512))
  (func $invoke_swap (param $fn i32) (param $ptr i32) (result i32)
    (call_indirect (type $t_ii) (local.get $ptr) (local.get $fn)))
  (func $broken (result i32) (i32.const 768))
  (func $invoke_broken (param $fn i32) (result i32)
    (call_indirect (type $t_i) (local.get $fn)))
  (func (export "last_deleted") (result i32)
    (i32.load (i32.const 1020)))
  (func (export "dynCall_i") (param $idx i32) (result i32)
    (call_indirect (type $t_i) (local.get $idx)))
  (func (export "dynCall_ii") (param $idx i32) (param i32) (result i32)
    (call_indirect (type $t_ii) (local.get 1) (local.get $idx)))
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $t_vi) (local.get 1) (local.get $idx)))
  (func (export "dynCall_iii") (param $idx i32) (param i32 i32) (result i32)
    (call_indirect (type $t_iii) (local.get 1) (local.get 2) (local.get $idx)))
  (func (export "dynCall_viii") (param $idx i32) (param i32 i32 i32)
    (call_indirect (type $t_viii) (local.get 1) (local.get 2) (local.get 3) (local.get $idx)))
  (func (export "__wasm_call_ctors")
    (call $reg_obj (i32.const 2048) (i32.const 24) (i32.const 40) (i32.const 1) (i32.const 44) (i32.const 2))
    (call $reg_field (i32.const 2048) (i32.const 32)
      (i32.const 1024) (i32.const 48) (i32.const 3) (i32.const 0)
      (i32.const 1024) (i32.const 56) (i32.const 4) (i32.const 0))
    (call $reg_field (i32.const 2048) (i32.const 36)
      (i32.const 1024) (i32.const 48) (i32.const 3) (i32.const 4)
      (i32.const 1024) (i32.const 56) (i32.const 4) (i32.const 4))
    (call $reg_field (i32.const 2048) (i32.const 88)
      (i32.const 1001) (i32.const 48) (i32.const 3) (i32.const 8)
      (i32.const 1001) (i32.const 56) (i32.const 4) (i32.const 8))
    (call $fin_obj (i32.const 2048))
    (call $reg_fn (i32.const 64) (i32.const 2) (i32.const 72) (i32.const 48) (i32.const 6) (i32.const 5) (i32.const 0))
    (call $reg_fn (i32.const 96) (i32.const 1) (i32.const 104) (i32.const 92) (i32.const 8) (i32.const 7) (i32.const 0))
    (call $reg_int (i32.const 1024) (i32.const 16) (i32.const 4) (i32.const -2147483648) (i32.const 2147483647))
    (call $reg_bool (i32.const 1001) (i32.const 80) (i32.const 1) (i32.const 0))))
"#;

/// `pump()` forwards one `readData()` result to `writeData`; `send()` writes
/// a memory view over the bytes `de ad be ef`.
pub const PUMP_MODULE: &str = r#"
(module
  (import "env" "_embind_register_void" (func $reg_void (param i32 i32)))
  (import "env" "_embind_register_emval" (func $reg_emval (param i32)))
  (import "env" "_embind_register_memory_view" (func $reg_view (param i32 i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (import "env" "_emval_get_global" (func $get_global (param i32) (result i32)))
  (import "env" "_emval_get_method_caller" (func $get_caller (param i32 i32 i32) (result i32)))
  (import "env" "_emval_call" (func $call (param i32 i32 i32 i32) (result f64)))
  (import "env" "_emval_take_value" (func $take (param i32 i32) (result i32)))
  (memory (export "memory") 1)
  (table 4 funcref)
  (elem (i32.const 1) $invoke_void $pump $send)
  (type $v (func))
  (type $vi (func (param i32)))
  (data (i32.const 16) "void\00")
  (data (i32.const 48) "readData\00")
  (data (i32.const 64) "writeData\00")
  (data (i32.const 80) "pump\00")
  (data (i32.const 88) "send\00")
  (data (i32.const 96) "vi\00")
  (data (i32.const 104) "emscripten::memory_view<unsigned char>\00")
  (data (i32.const 160) "\e8\03\00\00")
  (data (i32.const 168) "\b8\0b\00\00")
  (data (i32.const 176) "\e8\03\00\00\b8\0b\00\00")
  (data (i32.const 192) "\04\00\00\00\c8\00\00\00")
  (data (i32.const 200) "\de\ad\be\ef")
  (func $invoke_void (param $fn i32)
    (call_indirect (type $v) (local.get $fn)))
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $vi) (local.get 1) (local.get $idx)))
  (func $write (param $value i32)
    (local $caller i32)
    (local.set $caller (call $get_caller (i32.const 2) (i32.const 176) (i32.const 0)))
    (i32.store (i32.const 208) (local.get $value))
    (drop (call $call (local.get $caller) (call $get_global (i32.const 64)) (i32.const 0) (i32.const 208))))
  (func $pump
    (local $caller i32)
    (local.set $caller (call $get_caller (i32.const 1) (i32.const 168) (i32.const 0)))
    (call $write
      (i32.trunc_f64_u
        (call $call (local.get $caller) (call $get_global (i32.const 48)) (i32.const 0) (i32.const 0)))))
  (func $send
    (call $write (call $take (i32.const 4000) (i32.const 192))))
  (func (export "__wasm_call_ctors")
    (call $reg_void (i32.const 1000) (i32.const 16))
    (call $reg_emval (i32.const 3000))
    (call $reg_view (i32.const 4000) (i32.const 1) (i32.const 104))
    (call $reg_fn (i32.const 80) (i32.const 1) (i32.const 160) (i32.const 96) (i32.const 1) (i32.const 2) (i32.const 0))
    (call $reg_fn (i32.const 88) (i32.const 1) (i32.const 160) (i32.const 96) (i32.const 1) (i32.const 3) (i32.const 0))))
"#;

/// `hello()` writes `hi\n` to stdout through `fd_write`; `accent()` writes
/// the Latin-1 bytes `68 e9 0a`.
pub const HELLO_MODULE: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "env" "_embind_register_void" (func $reg_void (param i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (table 4 funcref)
  (elem (i32.const 1) $invoke_void $hello $accent)
  (type $v (func))
  (type $vi (func (param i32)))
  (data (i32.const 16) "void\00")
  (data (i32.const 24) "hello\00")
  (data (i32.const 32) "vi\00")
  (data (i32.const 40) "\e8\03\00\00")
  (data (i32.const 48) "accent\00")
  (data (i32.const 64) "hi\n")
  (data (i32.const 80) "\40\00\00\00\03\00\00\00")
  (data (i32.const 104) "h\e9\n")
  (data (i32.const 112) "\68\00\00\00\03\00\00\00")
  (func $invoke_void (param $fn i32)
    (call_indirect (type $v) (local.get $fn)))
  (func $hello
    (drop (call $fd_write (i32.const 1) (i32.const 80) (i32.const 1) (i32.const 96))))
  (func $accent
    (drop (call $fd_write (i32.const 1) (i32.const 112) (i32.const 1) (i32.const 96))))
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $vi) (local.get 1) (local.get $idx)))
  (func (export "__wasm_call_ctors")
    (call $reg_void (i32.const 1000) (i32.const 16))
    (call $reg_fn (i32.const 24) (i32.const 1) (i32.const 40) (i32.const 32) (i32.const 1) (i32.const 2) (i32.const 0))
    (call $reg_fn (i32.const 48) (i32.const 1) (i32.const 40) (i32.const 32) (i32.const 1) (i32.const 3) (i32.const 0))))
"#;

/// `boom()` throws a `std::runtime_error("probe failed")`.
pub const THROW_MODULE: &str = r#"
(module
  (import "env" "__cxa_throw" (func $throw (param i32 i32 i32)))
  (import "env" "_embind_register_void" (func $reg_void (param i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (global $sp (mut i32) (i32.const 4096))
  (table 4 funcref)
  (elem (i32.const 1) $invoke_void $boom)
  (type $v (func))
  (type $vi (func (param i32)))
  (data (i32.const 16) "void\00")
  (data (i32.const 24) "boom\00")
  (data (i32.const 32) "vi\00")
  (data (i32.const 40) "\e8\03\00\00")
  (data (i32.const 400) "std::runtime_error\00")
  (data (i32.const 432) "probe failed\00")
  (func $invoke_void (param $fn i32)
    (call_indirect (type $v) (local.get $fn)))
  (func $boom
    (call $throw (i32.const 300) (i32.const 77) (i32.const 0)))
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $vi) (local.get 1) (local.get $idx)))
  (func (export "stackSave") (result i32)
    (global.get $sp))
  (func (export "stackRestore") (param i32)
    (global.set $sp (local.get 0)))
  (func (export "stackAlloc") (param $size i32) (result i32)
    (global.set $sp (i32.and (i32.sub (global.get $sp) (local.get $size)) (i32.const -16)))
    (global.get $sp))
  (func (export "__get_exception_message") (param $ptr i32) (param $type i32) (param $message i32)
    (i32.store (local.get $type) (i32.const 400))
    (i32.store (local.get $message) (i32.const 432)))
  (func (export "__wasm_call_ctors")
    (call $reg_void (i32.const 1000) (i32.const 16))
    (call $reg_fn (i32.const 24) (i32.const 1) (i32.const 40) (i32.const 32) (i32.const 1) (i32.const 2) (i32.const 0))))
"#;

/// `fall()` moves the stack pointer to 4000 and reaches a trapping table
/// entry through `invoke_vi`, which moves it again to 3000 before trapping.
pub const TRAP_MODULE: &str = r#"
(module
  (import "env" "invoke_vi" (func $invoke_vi (param i32 i32)))
  (import "env" "_embind_register_void" (func $reg_void (param i32 i32)))
  (import "env" "_embind_register_function" (func $reg_fn (param i32 i32 i32 i32 i32 i32 i32)))
  (memory (export "memory") 1)
  (global $sp (mut i32) (i32.const 4096))
  (table 4 funcref)
  (elem (i32.const 1) $invoke_void $fall $bad)
  (type $v (func))
  (type $vi (func (param i32)))
  (data (i32.const 16) "void\00")
  (data (i32.const 24) "fall\00")
  (data (i32.const 32) "vi\00")
  (data (i32.const 40) "\e8\03\00\00")
  (func $invoke_void (param $fn i32)
    (call_indirect (type $v) (local.get $fn)))
  (func $fall
    (global.set $sp (i32.const 4000))
    (call $invoke_vi (i32.const 3) (i32.const 0)))
  (func $bad (param i32)
    (global.set $sp (i32.const 3000))
    unreachable)
  (func (export "dynCall_vi") (param $idx i32) (param i32)
    (call_indirect (type $vi) (local.get 1) (local.get $idx)))
  (func (export "stackSave") (result i32)
    (global.get $sp))
  (func (export "stackRestore") (param i32)
    (global.set $sp (local.get 0)))
  (func (export "__wasm_call_ctors")
    (call $reg_void (i32.const 1000) (i32.const 16))
    (call $reg_fn (i32.const 24) (i32.const 1) (i32.const 40) (i32.const 32) (i32.const 1) (i32.const 2) (i32.const 0))))
"#;

/// Host for `text`, not yet initialized.
pub fn host(text: &str) -> ModuleHost {
    let wasm = wat::parse_str(text).expect("fixture should assemble");
    ModuleHost::from_bytes(wasm, HostConfig::default())
}

/// Host for `text`, initialized.
pub fn ready_host(text: &str) -> ModuleHost {
    let mut host = host(text);
    host.initialize().expect("fixture should initialize");
    host
}
