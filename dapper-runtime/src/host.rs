// Dapper - dapper-runtime
// Module: Module Host
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lifecycle of one hosted module.
//!
//! A [`ModuleHost`] walks a fixed sequence of phases, each checking that its
//! predecessor completed:
//!
//! ```text
//! Unloaded -> MemoryAllocated -> ImportsBound -> Instantiated -> ConstructorsRun -> Ready
//! ```
//!
//! There is no way back. Loading a different module means building a new
//! host.

use std::{fmt, path::PathBuf};

use dapper_error::{codes, helpers, Error, ErrorCategory, Result};
use dapper_host::HostCallbacks;
use log::{debug, info};
use wasmi::{AsContextMut, Engine, Extern, ExternType, Linker, Memory, Module, Store, Val};

use crate::{
    config::HostConfig,
    dyncall,
    emval::EmvalTable,
    functions::{call_function, FunctionEntry},
    imports::{define_import, emval::read_heap_element},
    memory::LinearMemory,
    registry::RawType,
    state::{ExportTable, HostState},
    trap::from_wasmi,
    value::Value,
};

/// Export run once to execute static constructors
pub const CONSTRUCTORS_EXPORT: &str = "__wasm_call_ctors";

/// Lifecycle phase of a [`ModuleHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostPhase {
    /// Nothing loaded
    Unloaded,
    /// Module compiled, imported memory created
    MemoryAllocated,
    /// Import dictionary linked
    ImportsBound,
    /// Instance created, exports collected
    Instantiated,
    /// Static constructors have run
    ConstructorsRun,
    /// Calls are accepted
    Ready,
}

impl HostPhase {
    /// Phase that must precede this one
    #[must_use]
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::Unloaded => None,
            Self::MemoryAllocated => Some(Self::Unloaded),
            Self::ImportsBound => Some(Self::MemoryAllocated),
            Self::Instantiated => Some(Self::ImportsBound),
            Self::ConstructorsRun => Some(Self::Instantiated),
            Self::Ready => Some(Self::ConstructorsRun),
        }
    }
}

/// Where the module binary comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A file on disk
    Path(PathBuf),
    /// Bytes already in memory
    Bytes(Vec<u8>),
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl ModuleSource {
    fn load(&self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => std::fs::read(path).map_err(|err| {
                Error::new(
                    ErrorCategory::Initialization,
                    codes::MODULE_LOAD_ERROR,
                    format!("Failed to load module {}: {err}", path.display()),
                )
            }),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A memory the host created to satisfy a memory import.
struct ImportedMemory {
    module: String,
    name:   String,
    memory: Memory,
}

/// Host of one embind/emscripten module.
pub struct ModuleHost {
    engine:          Engine,
    store:           Store<HostState>,
    linker:          Linker<HostState>,
    module:          Option<Module>,
    imported_memory: Option<ImportedMemory>,
    source:          ModuleSource,
    phase:           HostPhase,
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("source", &self.source)
            .field("phase", &self.phase)
            .field("state", self.store.data())
            .finish_non_exhaustive()
    }
}

impl ModuleHost {
    /// Host for the module named by `config`, or the default module next to
    /// the executable.
    pub fn new(config: HostConfig) -> Result<Self> {
        let path = config.resolve_module_path()?;
        Ok(Self::with_source(ModuleSource::Path(path), config, HostCallbacks::new()))
    }

    /// Host for a module binary already in memory.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, config: HostConfig) -> Self {
        Self::with_source(ModuleSource::Bytes(bytes.into()), config, HostCallbacks::new())
    }

    /// Host for `source` with the given callbacks.
    #[must_use]
    pub fn with_source(source: ModuleSource, config: HostConfig, mut callbacks: HostCallbacks) -> Self {
        if config.trace_transport {
            callbacks.register_trace_handler(|direction, bytes| {
                debug!("{} packet: {}", direction.as_str(), hex(bytes));
            });
        }
        let engine = Engine::default();
        let store = Store::new(&engine, HostState::new(config, callbacks));
        let linker = Linker::new(&engine);
        Self {
            engine,
            store,
            linker,
            module: None,
            imported_memory: None,
            source,
            phase: HostPhase::Unloaded,
        }
    }

    fn advance(&mut self, to: HostPhase) -> Result<()> {
        match to.predecessor() {
            Some(from) if from == self.phase => {
                debug!("module host {:?} -> {:?}", self.phase, to);
                self.phase = to;
                Ok(())
            }
            _ => Err(helpers::invalid_state_transition(self.phase, to)),
        }
    }

    fn expect_phase(&self, to: HostPhase) -> Result<()> {
        match to.predecessor() {
            Some(from) if from == self.phase => Ok(()),
            _ => Err(helpers::invalid_state_transition(self.phase, to)),
        }
    }

    fn module(&self) -> Result<Module> {
        self.module
            .clone()
            .ok_or_else(|| helpers::invalid_state_transition(self.phase, HostPhase::MemoryAllocated))
    }

    /// Read and compile the module, creating the memory it imports.
    ///
    /// # Errors
    ///
    /// Returns `MODULE_LOAD_ERROR` when the file cannot be read and
    /// `MALFORMED_MODULE` when it does not compile.
    pub fn allocate_memory(&mut self) -> Result<()> {
        self.expect_phase(HostPhase::MemoryAllocated)?;
        let bytes = self.source.load()?;
        let module = Module::new(&self.engine, &bytes[..]).map_err(|err| {
            Error::new(ErrorCategory::Initialization, codes::MALFORMED_MODULE, err.to_string())
        })?;
        for import in module.imports() {
            if let ExternType::Memory(ty) = import.ty() {
                let memory = Memory::new(&mut self.store, *ty).map_err(|err| {
                    Error::new(ErrorCategory::Memory, codes::INSTANTIATION_ERROR, err.to_string())
                })?;
                debug!("created memory for import {}.{}", import.module(), import.name());
                self.imported_memory = Some(ImportedMemory {
                    module: import.module().to_string(),
                    name: import.name().to_string(),
                    memory,
                });
            }
        }
        self.module = Some(module);
        self.advance(HostPhase::MemoryAllocated)
    }

    /// Link every import the module declares.
    ///
    /// # Errors
    ///
    /// Returns `UNRESOLVED_IMPORT` for an import with no handler.
    pub fn bind_imports(&mut self) -> Result<()> {
        self.expect_phase(HostPhase::ImportsBound)?;
        let module = self.module()?;
        for import in module.imports() {
            match import.ty() {
                ExternType::Func(func_type) => {
                    define_import(&mut self.linker, import.module(), import.name(), func_type.clone())?;
                }
                ExternType::Memory(_) => {
                    let memory = self
                        .imported_memory
                        .as_ref()
                        .filter(|imported| {
                            imported.module == import.module() && imported.name == import.name()
                        })
                        .map(|imported| imported.memory)
                        .ok_or_else(|| helpers::unresolved_import(import.module(), import.name()))?;
                    self.linker
                        .define(import.module(), import.name(), memory)
                        .map_err(|err| helpers::unresolved_import(import.module(), import.name()).context(err))?;
                }
                _ => return Err(helpers::unresolved_import(import.module(), import.name())),
            }
        }
        self.advance(HostPhase::ImportsBound)
    }

    /// Create the instance, collect its exports and locate its memory.
    ///
    /// # Errors
    ///
    /// Returns `INSTANTIATION_ERROR` when linking fails and
    /// `MEMORY_NOT_FOUND` when the module neither exports nor imports memory.
    pub fn instantiate(&mut self) -> Result<()> {
        self.expect_phase(HostPhase::Instantiated)?;
        let module = self.module()?;
        let instance = self
            .linker
            .instantiate(&mut self.store, &module)
            .map_err(|err| {
                Error::new(ErrorCategory::Initialization, codes::INSTANTIATION_ERROR, err.to_string())
            })?
            .start(&mut self.store)
            .map_err(from_wasmi)?;

        let mut exports = ExportTable::default();
        let mut exported_memory = None;
        for export in instance.exports(&self.store) {
            let name = export.name().to_string();
            match export.into_extern() {
                Extern::Func(func) => exports.insert(name, func),
                Extern::Memory(memory) if name == "memory" => exported_memory = Some(memory),
                _ => {}
            }
        }
        let memory = exported_memory
            .or(self.imported_memory.as_ref().map(|imported| imported.memory))
            .map(LinearMemory::new)
            .ok_or_else(helpers::memory_not_found)?;
        let heap = memory.heap_u8(&self.store);
        info!("instantiated module with {} function exports", exports.len());

        let state = self.store.data_mut();
        state.exports = exports;
        state.memory = Some(memory);
        state.heap = Some(heap);
        self.advance(HostPhase::Instantiated)
    }

    /// Run static constructors once, then seed the emval table.
    ///
    /// Embind registrations happen here.
    pub fn run_constructors(&mut self) -> Result<()> {
        self.expect_phase(HostPhase::ConstructorsRun)?;
        let mut ctx = self.store.as_context_mut();
        if ctx.data().exports.get(CONSTRUCTORS_EXPORT).is_some() {
            dyncall::call_export(&mut ctx, CONSTRUCTORS_EXPORT, &[])?;
        }
        ctx.data_mut().emval.seed();
        let state = self.store.data();
        debug!(
            "constructors registered {} types and {} functions",
            state.registry.types().len(),
            state.functions.len()
        );
        self.advance(HostPhase::ConstructorsRun)
    }

    /// Enter [`HostPhase::Ready`].
    pub fn finish(&mut self) -> Result<()> {
        self.advance(HostPhase::Ready)
    }

    /// Run every lifecycle step in order.
    pub fn initialize(&mut self) -> Result<()> {
        self.allocate_memory()?;
        self.bind_imports()?;
        self.instantiate()?;
        self.run_constructors()?;
        self.finish()?;
        info!("module host ready");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.phase == HostPhase::Ready {
            Ok(())
        } else {
            Err(helpers::host_not_ready(self.phase))
        }
    }

    /// Call the embind function exposed as `name`.
    ///
    /// # Errors
    ///
    /// Returns `HOST_NOT_READY` before [`initialize`](Self::initialize)
    /// completes, `FUNCTION_NOT_FOUND`, `UNBOUND_TYPES` or
    /// `ARGUMENT_COUNT_MISMATCH` for bad calls, and whatever the module
    /// raises.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        self.ensure_ready()?;
        debug!("calling {name} with {} arguments", args.len());
        call_function(&mut self.store.as_context_mut(), name, args)
    }

    /// Call a raw export.
    pub fn call_export(&mut self, name: &str, args: &[Val]) -> Result<Option<Val>> {
        self.ensure_ready()?;
        dyncall::call_export(&mut self.store.as_context_mut(), name, args)
    }

    /// Elements of an array-like value returned by the module.
    ///
    /// Heap views are read out of linear memory as they stand now.
    ///
    /// # Errors
    ///
    /// Returns `TYPE_MISMATCH` for values that are not array-like.
    pub fn array_elements(&mut self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.clone()),
            Value::Bytes(view) => Ok(view.to_vec()?.into_iter().map(|byte| Value::Int(byte.into())).collect()),
            Value::Words(view) => Ok(view.to_vec()?.into_iter().map(|word| Value::Int(word.into())).collect()),
            Value::HeapView(view) => {
                let ctx = self.store.as_context_mut();
                (0..i64::from(view.length)).map(|index| read_heap_element(&ctx, view, index)).collect()
            }
            other => Err(helpers::type_mismatch(format!("{} is not array-like", other.type_name()))),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Whether calls are accepted
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == HostPhase::Ready
    }

    /// Where the module is loaded from
    #[must_use]
    pub fn source(&self) -> &ModuleSource {
        &self.source
    }

    /// Host configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.store.data().config
    }

    /// Host callbacks
    #[must_use]
    pub fn callbacks(&self) -> &HostCallbacks {
        &self.store.data().callbacks
    }

    /// Host callbacks, for installing handlers and transports
    pub fn callbacks_mut(&mut self) -> &mut HostCallbacks {
        &mut self.store.data_mut().callbacks
    }

    /// Emval handle table
    #[must_use]
    pub fn emval(&self) -> &EmvalTable {
        &self.store.data().emval
    }

    /// Exposed names of registered functions
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        self.store.data().functions.keys().cloned().collect()
    }

    /// Rendered signature of a bound function
    #[must_use]
    pub fn function_signature(&self, name: &str) -> Option<String> {
        match self.store.data().functions.get(name)? {
            FunctionEntry::Bound(function) => Some(function.signature()),
            FunctionEntry::Unbound { .. } => None,
        }
    }

    /// Registered types and their names
    #[must_use]
    pub fn registered_types(&self) -> Vec<(RawType, String)> {
        self.store.data().registry.types()
    }

    /// Names of the function exports
    #[must_use]
    pub fn export_names(&self) -> Vec<String> {
        self.store.data().exports.names()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = r#"(module (memory (export "memory") 1))"#;

    fn host(text: &str) -> ModuleHost {
        ModuleHost::from_bytes(wat::parse_str(text).unwrap(), HostConfig::default())
    }

    #[test]
    fn test_phases_in_order() {
        let mut host = host(EMPTY);
        assert_eq!(host.phase(), HostPhase::Unloaded);
        host.allocate_memory().unwrap();
        assert_eq!(host.phase(), HostPhase::MemoryAllocated);
        host.bind_imports().unwrap();
        host.instantiate().unwrap();
        host.run_constructors().unwrap();
        assert!(host.emval().is_seeded());
        host.finish().unwrap();
        assert!(host.is_ready());
    }

    #[test]
    fn test_out_of_order_step_fails() {
        let mut host = host(EMPTY);
        let err = host.instantiate().unwrap_err();
        assert_eq!(err.code, codes::INVALID_STATE_TRANSITION);
        assert_eq!(host.phase(), HostPhase::Unloaded);
        host.initialize().unwrap();
        assert_eq!(host.allocate_memory().unwrap_err().code, codes::INVALID_STATE_TRANSITION);
    }

    #[test]
    fn test_malformed_module() {
        let mut host = ModuleHost::from_bytes(vec![0, 1, 2, 3], HostConfig::default());
        assert_eq!(host.initialize().unwrap_err().code, codes::MALFORMED_MODULE);
    }

    #[test]
    fn test_missing_file() {
        let config = HostConfig::default().with_module_path("/nonexistent/dapper.wasm");
        let mut host = ModuleHost::new(config).unwrap();
        assert_eq!(host.initialize().unwrap_err().code, codes::MODULE_LOAD_ERROR);
    }

    #[test]
    fn test_module_without_memory() {
        let mut host = host("(module)");
        assert_eq!(host.initialize().unwrap_err().code, codes::MEMORY_NOT_FOUND);
    }

    #[test]
    fn test_imported_memory_is_used() {
        let mut host = host(r#"(module (import "env" "memory" (memory 1)))"#);
        host.initialize().unwrap();
        assert!(host.store.data().heap_u8().is_ok());
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xAB, 0x10]), "00 ab 10");
    }
}
