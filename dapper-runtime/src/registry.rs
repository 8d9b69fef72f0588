// Dapper - dapper-runtime
// Module: Type Registry
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Converters keyed by embind type id, with deferred resolution.
//!
//! The module registers types in whatever order its static constructors run,
//! so a function or value object may name types that do not exist yet. Such a
//! registration is parked with [`TypeRegistry::when_dependent_types_are_resolved`]
//! and handed back as a [`Resolved`] entry once its last dependency arrives.
//! The registry never runs completion logic itself; the caller processes
//! resolved entries and registers the converters they produce, which may in
//! turn resolve further entries.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use dapper_error::{helpers, Result};
use log::{debug, error};

use crate::{structs::StructConverter, value::ViewKind};

/// Type id assigned by the module
pub type RawType = u32;

/// Slot size of every argument in an `_emval_call` argument pack
pub const GENERIC_WIRE_TYPE_SIZE: u32 = 8;

/// How values of a registered type cross the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ConverterKind {
    /// `void`
    Void,
    /// `bool` with its wire encodings
    Bool {
        /// Wire value of `true`
        true_value:  i32,
        /// Wire value of `false`
        false_value: i32,
    },
    /// Integer of `size` bytes
    Integer {
        /// Width in bytes
        size:   u32,
        /// Whether the type is signed
        signed: bool,
    },
    /// 64-bit integer
    BigInt {
        /// Width in bytes
        size:   u32,
        /// Whether the type is signed
        signed: bool,
    },
    /// Floating point of `size` bytes
    Float {
        /// Width in bytes
        size: u32,
    },
    /// `std::string`, length-prefixed
    StdString {
        /// Whether the payload is UTF-8
        utf8: bool,
    },
    /// `std::wstring`
    StdWString {
        /// Width of one code unit in bytes
        char_size: u32,
    },
    /// `emscripten::val`
    Emval,
    /// `typed_memory_view`
    MemoryView {
        /// Element type
        kind: ViewKind,
    },
    /// Value object with named fields
    ValueObject(Arc<StructConverter>),
}

/// A registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConverter {
    /// Name the module registered
    pub name:             String,
    /// Wire behaviour
    pub kind:             ConverterKind,
    /// Bytes this type occupies in an argument pack
    pub arg_pack_advance: u32,
}

impl TypeConverter {
    /// Create a converter; void occupies no argument pack space.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ConverterKind) -> Self {
        let arg_pack_advance =
            if kind == ConverterKind::Void { 0 } else { GENERIC_WIRE_TYPE_SIZE };
        Self {
            name: name.into(),
            kind,
            arg_pack_advance,
        }
    }

    /// Whether this is `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.kind == ConverterKind::Void
    }
}

/// Options for [`TypeRegistry::register_type`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Silently keep the first converter when an id is registered twice
    pub ignore_duplicate_registrations: bool,
}

/// A deferred registration whose dependencies are all known.
#[derive(Debug)]
pub struct Resolved<A> {
    /// Types the completion must register, in order
    pub own_types:  Vec<RawType>,
    /// Converters of the dependencies, in the order they were requested
    pub converters: Vec<TypeConverter>,
    /// What to do with them
    pub action:     A,
}

#[derive(Debug)]
struct Pending<A> {
    own_types:    Vec<RawType>,
    dependencies: Vec<RawType>,
    resolved:     Vec<Option<TypeConverter>>,
    outstanding:  usize,
    action:       A,
}

impl<A> Pending<A> {
    fn finish(self) -> Resolved<A> {
        Resolved {
            own_types:  self.own_types,
            converters: self.resolved.into_iter().flatten().collect(),
            action:     self.action,
        }
    }
}

/// Type registry with deferred resolution.
#[derive(Debug)]
pub struct TypeRegistry<A> {
    registered:        HashMap<RawType, TypeConverter>,
    awaiting:          HashMap<RawType, Vec<usize>>,
    pending:           HashMap<usize, Pending<A>>,
    type_dependencies: HashMap<RawType, Vec<RawType>>,
    next_pending:      usize,
}

impl<A> Default for TypeRegistry<A> {
    fn default() -> Self {
        Self {
            registered:        HashMap::new(),
            awaiting:          HashMap::new(),
            pending:           HashMap::new(),
            type_dependencies: HashMap::new(),
            next_pending:      0,
        }
    }
}

impl<A> TypeRegistry<A> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` under `raw_type`.
    ///
    /// Returns the deferred registrations this completed.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_TYPE_ID` for a non-positive id. A duplicate id is
    /// logged and replaced, unless `ignore_duplicate_registrations` keeps the
    /// existing converter.
    pub fn register_type(
        &mut self,
        raw_type: i32,
        converter: TypeConverter,
        options: RegisterOptions,
    ) -> Result<Vec<Resolved<A>>> {
        if raw_type <= 0 {
            return Err(helpers::invalid_type_id(&converter.name));
        }
        let raw_type = raw_type as RawType;
        if let Some(existing) = self.registered.get(&raw_type) {
            if options.ignore_duplicate_registrations {
                return Ok(Vec::new());
            }
            error!(
                "Cannot register type '{}' twice (id {raw_type} already holds '{}')",
                converter.name, existing.name
            );
        }
        debug!("registered type {raw_type} as {}", converter.name);
        self.registered.insert(raw_type, converter);
        self.type_dependencies.remove(&raw_type);
        Ok(self.notify(raw_type))
    }

    fn notify(&mut self, raw_type: RawType) -> Vec<Resolved<A>> {
        let Some(waiters) = self.awaiting.remove(&raw_type) else {
            return Vec::new();
        };
        let Some(converter) = self.registered.get(&raw_type).cloned() else {
            return Vec::new();
        };
        let mut ready = Vec::new();
        for id in waiters {
            let Some(pending) = self.pending.get_mut(&id) else {
                continue;
            };
            for (slot, dependency) in pending.resolved.iter_mut().zip(&pending.dependencies) {
                if *dependency == raw_type && slot.is_none() {
                    *slot = Some(converter.clone());
                    pending.outstanding -= 1;
                }
            }
            if pending.outstanding == 0 {
                if let Some(pending) = self.pending.remove(&id) {
                    ready.push(pending.finish());
                }
            }
        }
        ready
    }

    /// Run `action` once every type in `dependencies` is registered.
    ///
    /// Returns the entry immediately when nothing is missing; otherwise it
    /// comes back from the [`register_type`](Self::register_type) call that
    /// supplies the last dependency.
    pub fn when_dependent_types_are_resolved(
        &mut self,
        own_types: Vec<RawType>,
        dependencies: Vec<RawType>,
        action: A,
    ) -> Option<Resolved<A>> {
        for own in &own_types {
            self.type_dependencies.insert(*own, dependencies.clone());
        }
        let resolved: Vec<Option<TypeConverter>> =
            dependencies.iter().map(|dependency| self.registered.get(dependency).cloned()).collect();
        let outstanding = resolved.iter().filter(|slot| slot.is_none()).count();
        let pending = Pending {
            own_types,
            dependencies,
            resolved,
            outstanding,
            action,
        };
        if outstanding == 0 {
            return Some(pending.finish());
        }
        let id = self.next_pending;
        self.next_pending += 1;
        let missing: HashSet<RawType> = pending
            .dependencies
            .iter()
            .zip(&pending.resolved)
            .filter(|(_, slot)| slot.is_none())
            .map(|(dependency, _)| *dependency)
            .collect();
        for dependency in missing {
            self.awaiting.entry(dependency).or_default().push(id);
        }
        self.pending.insert(id, pending);
        None
    }

    /// Register the converters a completed entry produced.
    ///
    /// # Errors
    ///
    /// Returns `CONVERTER_COUNT_MISMATCH` unless there is exactly one
    /// converter per own type.
    pub fn register_resolved(
        &mut self,
        own_types: &[RawType],
        converters: Vec<TypeConverter>,
    ) -> Result<Vec<Resolved<A>>> {
        if converters.len() != own_types.len() {
            return Err(helpers::converter_count_mismatch(own_types.len(), converters.len()));
        }
        let mut ready = Vec::new();
        for (raw_type, converter) in own_types.iter().zip(converters) {
            ready.extend(self.register_type(
                *raw_type as i32,
                converter,
                RegisterOptions::default(),
            )?);
        }
        Ok(ready)
    }

    /// Converter registered under `raw_type`
    #[must_use]
    pub fn get(&self, raw_type: RawType) -> Option<&TypeConverter> {
        self.registered.get(&raw_type)
    }

    /// Converter registered under `raw_type`.
    ///
    /// # Errors
    ///
    /// Returns `UNREGISTERED_TYPE` when nothing is registered.
    pub fn require(&self, raw_type: RawType) -> Result<&TypeConverter> {
        self.registered.get(&raw_type).ok_or_else(|| helpers::unregistered_type(raw_type))
    }

    /// Whether `raw_type` is registered
    #[must_use]
    pub fn is_registered(&self, raw_type: RawType) -> bool {
        self.registered.contains_key(&raw_type)
    }

    /// Ids among `types` that are neither registered nor waiting on
    /// something, following the dependencies of waiting types.
    #[must_use]
    pub fn unbound_types(&self, types: &[RawType]) -> Vec<RawType> {
        let mut unbound = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<RawType> = types.iter().rev().copied().collect();
        while let Some(raw_type) = stack.pop() {
            if !seen.insert(raw_type) || self.registered.contains_key(&raw_type) {
                continue;
            }
            match self.type_dependencies.get(&raw_type) {
                Some(dependencies) => stack.extend(dependencies.iter().rev()),
                None => unbound.push(raw_type),
            }
        }
        unbound
    }

    /// Number of deferred registrations still waiting
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Registered `(id, name)` pairs ordered by id
    #[must_use]
    pub fn types(&self) -> Vec<(RawType, String)> {
        let mut types: Vec<_> =
            self.registered.iter().map(|(id, converter)| (*id, converter.name.clone())).collect();
        types.sort_unstable_by_key(|(id, _)| *id);
        types
    }
}
