// Dapper - dapper-runtime
// Module: Host State
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Per-instance state carried in the engine store.
//!
//! Import handlers receive the store context, so everything they touch
//! lives here.

use std::collections::{BTreeMap, HashMap};

use dapper_error::{helpers, Result};
use dapper_host::HostCallbacks;
use wasmi::Func;

use crate::{
    config::HostConfig,
    emval::EmvalTable,
    functions::{FunctionBinding, FunctionEntry},
    imports::emval::MethodCaller,
    memory::LinearMemory,
    registry::{RawType, TypeRegistry},
    structs::StructRegistration,
    value::HeapView,
};

/// Completion parked in the type registry.
#[derive(Debug)]
pub enum PendingAction {
    /// Finalize a value object once its field types exist
    FinalizeStruct(StructRegistration),
    /// Bind a function once its argument and return types exist
    BindFunction(FunctionBinding),
}

/// Function exports of the instance.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    funcs: HashMap<String, Func>,
}

impl ExportTable {
    pub(crate) fn insert(&mut self, name: impl Into<String>, func: Func) {
        self.funcs.insert(name.into(), func);
    }

    /// Export `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).copied()
    }

    /// Export `name`.
    ///
    /// # Errors
    ///
    /// Returns `EXPORT_NOT_FOUND` when there is no such export.
    pub fn require(&self, name: &str) -> Result<Func> {
        self.get(name).ok_or_else(|| helpers::export_not_found(name))
    }

    /// Export names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.funcs.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of exports
    #[must_use]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Whether there are no exports
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// Store data of a hosted module.
#[derive(Debug)]
pub struct HostState {
    pub(crate) config:         HostConfig,
    pub(crate) callbacks:      HostCallbacks,
    pub(crate) memory:         Option<LinearMemory>,
    pub(crate) heap:           Option<HeapView>,
    pub(crate) exports:        ExportTable,
    pub(crate) emval:          EmvalTable,
    pub(crate) registry:       TypeRegistry<PendingAction>,
    pub(crate) value_objects:  HashMap<RawType, StructRegistration>,
    pub(crate) functions:      BTreeMap<String, FunctionEntry>,
    pub(crate) method_callers: Vec<MethodCaller>,
}

impl HostState {
    /// Fresh state for a module that has not been loaded yet.
    #[must_use]
    pub fn new(config: HostConfig, callbacks: HostCallbacks) -> Self {
        Self {
            config,
            callbacks,
            memory: None,
            heap: None,
            exports: ExportTable::default(),
            emval: EmvalTable::new(),
            registry: TypeRegistry::new(),
            value_objects: HashMap::new(),
            functions: BTreeMap::new(),
            method_callers: Vec::new(),
        }
    }

    /// Host configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Host callbacks
    #[must_use]
    pub fn callbacks(&self) -> &HostCallbacks {
        &self.callbacks
    }

    /// Function exports
    #[must_use]
    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    /// Emval handle table
    #[must_use]
    pub fn emval(&self) -> &EmvalTable {
        &self.emval
    }

    /// Type registry
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry<PendingAction> {
        &self.registry
    }

    /// `HEAPU8`, once memory is known.
    pub fn heap_u8(&self) -> Result<HeapView> {
        self.heap.ok_or_else(helpers::memory_not_found)
    }
}
