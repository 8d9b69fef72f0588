// Dapper - dapper-runtime
// Module: Emval Handle Table
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Handle table backing `emscripten::val`.
//!
//! Each handle owns two slots: the value at `h` and its reference count at
//! `h + 1`. Handles 0 through 9 are reserved; after [`EmvalTable::seed`] the
//! even ones among them hold `undefined`, `null`, `true` and `false`, and
//! they are never reclaimed.
//!
//! Reclamation only happens from a count of exactly one, and
//! [`EmvalTable::decref`] never lowers a count. A handle that was increfed is
//! therefore kept for the life of the table.

use dapper_error::{helpers, Result};
use log::trace;

use crate::value::Value;

/// Handle of `undefined`
pub const UNDEFINED_HANDLE: u32 = 2;
/// Handle of `null`
pub const NULL_HANDLE: u32 = 4;
/// Handle of `true`
pub const TRUE_HANDLE: u32 = 6;
/// Handle of `false`
pub const FALSE_HANDLE: u32 = 8;
/// First handle available for dynamic values
pub const FIRST_DYNAMIC_HANDLE: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Empty,
    Value(Value),
    RefCount(u32),
}

/// Slot table mapping `u32` handles to host values.
#[derive(Debug, Clone)]
pub struct EmvalTable {
    slots:     Vec<Slot>,
    free_list: Vec<u32>,
    seeded:    bool,
}

impl Default for EmvalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EmvalTable {
    /// Create a table with the reserved slots empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots:     vec![Slot::Empty; FIRST_DYNAMIC_HANDLE as usize],
            free_list: Vec::new(),
            seeded:    false,
        }
    }

    /// Install the reserved constants.
    pub fn seed(&mut self) {
        let constants = [
            (UNDEFINED_HANDLE, Value::Undefined),
            (NULL_HANDLE, Value::Null),
            (TRUE_HANDLE, Value::Bool(true)),
            (FALSE_HANDLE, Value::Bool(false)),
        ];
        for (handle, value) in constants {
            self.slots[handle as usize] = Slot::Value(value);
            self.slots[handle as usize + 1] = Slot::RefCount(1);
        }
        self.slots[1] = Slot::RefCount(1);
        self.seeded = true;
    }

    /// Whether [`seed`](Self::seed) ran
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Store `value` and return its handle.
    ///
    /// `undefined`, `null`, `true` and `false` map to their reserved handles
    /// without allocating.
    pub fn to_handle(&mut self, value: Value) -> u32 {
        match value {
            Value::Undefined => return UNDEFINED_HANDLE,
            Value::Null => return NULL_HANDLE,
            Value::Bool(true) => return TRUE_HANDLE,
            Value::Bool(false) => return FALSE_HANDLE,
            _ => {}
        }
        let handle = self.free_list.pop().unwrap_or(self.slots.len() as u32);
        let index = handle as usize;
        if self.slots.len() < index + 2 {
            self.slots.resize(index + 2, Slot::Empty);
        }
        trace!("emval {handle} <- {}", value.type_name());
        self.slots[index] = Slot::Value(value);
        self.slots[index + 1] = Slot::RefCount(1);
        handle
    }

    /// Value behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_HANDLE` unless the slot holds a value.
    pub fn to_value(&self, handle: u32) -> Result<Value> {
        match self.slots.get(handle as usize) {
            Some(Slot::Value(value)) => Ok(value.clone()),
            _ => Err(helpers::invalid_handle(handle)),
        }
    }

    /// Increment the count of a dynamic handle. Reserved handles are ignored.
    pub fn incref(&mut self, handle: u32) -> Result<()> {
        if handle < FIRST_DYNAMIC_HANDLE {
            return Ok(());
        }
        match self.slots.get_mut(handle as usize + 1) {
            Some(Slot::RefCount(count)) => {
                *count += 1;
                Ok(())
            }
            _ => Err(helpers::invalid_handle(handle)),
        }
    }

    /// Release a dynamic handle whose count is exactly one.
    ///
    /// Any other count is left untouched.
    pub fn decref(&mut self, handle: u32) -> Result<()> {
        if handle < FIRST_DYNAMIC_HANDLE {
            return Ok(());
        }
        let index = handle as usize;
        if index + 1 >= self.slots.len() {
            return Err(helpers::invalid_handle(handle));
        }
        if matches!(self.slots[index], Slot::Value(_))
            && self.slots[index + 1] == Slot::RefCount(1)
        {
            trace!("emval {handle} released");
            self.slots[index] = Slot::Empty;
            self.free_list.push(handle);
        }
        Ok(())
    }

    /// Reference count stored for `handle`
    #[must_use]
    pub fn refcount(&self, handle: u32) -> Option<u32> {
        match self.slots.get(handle as usize + 1) {
            Some(Slot::RefCount(count)) => Some(*count),
            _ => None,
        }
    }

    /// Number of live dynamic values
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .skip(FIRST_DYNAMIC_HANDLE as usize)
            .step_by(2)
            .filter(|slot| matches!(slot, Slot::Value(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use dapper_error::codes;

    use super::*;

    fn seeded() -> EmvalTable {
        let mut table = EmvalTable::new();
        table.seed();
        table
    }

    #[test]
    fn test_reserved_constants() {
        let mut table = seeded();
        assert_eq!(table.to_handle(Value::Undefined), UNDEFINED_HANDLE);
        assert_eq!(table.to_handle(Value::Null), NULL_HANDLE);
        assert_eq!(table.to_handle(Value::Bool(true)), TRUE_HANDLE);
        assert_eq!(table.to_handle(Value::Bool(false)), FALSE_HANDLE);
        assert_eq!(table.to_value(TRUE_HANDLE).unwrap(), Value::Bool(true));
        assert_eq!(table.to_value(0).unwrap_err().code, codes::INVALID_HANDLE);
        assert_eq!(table.live_count(), 0);
    }

    #[test]
    fn test_unseeded_constants_are_empty() {
        let table = EmvalTable::new();
        assert!(!table.is_seeded());
        assert_eq!(table.to_value(NULL_HANDLE).unwrap_err().code, codes::INVALID_HANDLE);
    }

    #[test]
    fn test_first_dynamic_handle_and_reuse() {
        let mut table = seeded();
        let a = table.to_handle(Value::Int(1));
        let b = table.to_handle(Value::from("b"));
        assert_eq!(a, FIRST_DYNAMIC_HANDLE);
        assert_eq!(b, FIRST_DYNAMIC_HANDLE + 2);
        table.decref(a).unwrap();
        assert_eq!(table.to_value(a).unwrap_err().code, codes::INVALID_HANDLE);
        assert_eq!(table.to_handle(Value::Int(3)), a);
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn test_incref_pins_the_value() {
        let mut table = seeded();
        let handle = table.to_handle(Value::Int(7));
        table.incref(handle).unwrap();
        assert_eq!(table.refcount(handle), Some(2));
        table.decref(handle).unwrap();
        table.decref(handle).unwrap();
        assert_eq!(table.to_value(handle).unwrap(), Value::Int(7));
        assert_eq!(table.refcount(handle), Some(2));
    }

    #[test]
    fn test_reserved_handles_ignore_counting() {
        let mut table = seeded();
        table.incref(NULL_HANDLE).unwrap();
        table.decref(NULL_HANDLE).unwrap();
        assert_eq!(table.to_value(NULL_HANDLE).unwrap(), Value::Null);
        assert_eq!(table.refcount(NULL_HANDLE), Some(1));
    }

    #[test]
    fn test_unknown_handles() {
        let mut table = seeded();
        assert_eq!(table.incref(40).unwrap_err().code, codes::INVALID_HANDLE);
        assert_eq!(table.decref(40).unwrap_err().code, codes::INVALID_HANDLE);
    }
}
