// Dapper - dapper-runtime
// Module: Host Configuration
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Configuration for the module host.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! module_path = "webix-dapper-wasm.wasm"
//! stack_control = true
//! exception_message_limit = 500
//! trace_transport = false
//! ```

use std::path::{Path, PathBuf};

use dapper_error::{helpers, Result};
use serde::{Deserialize, Serialize};

/// File name of the module looked up next to the executable
pub const DEFAULT_MODULE_FILE_NAME: &str = "webix-dapper-wasm.wasm";
/// Default cap on exception type names and messages, in bytes
pub const DEFAULT_EXCEPTION_MESSAGE_LIMIT: usize = 500;

/// Module host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Module to load; defaults to [`DEFAULT_MODULE_FILE_NAME`] beside the
    /// running executable
    pub module_path:             Option<PathBuf>,
    /// Save and restore the module stack around trampolines and exception
    /// lookups
    pub stack_control:           bool,
    /// Cap on exception type names and messages, in bytes
    pub exception_message_limit: usize,
    /// Log every packet moved through the transport at debug level
    pub trace_transport:         bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_path:             None,
            stack_control:           true,
            exception_message_limit: DEFAULT_EXCEPTION_MESSAGE_LIMIT,
            trace_transport:         false,
        }
    }
}

impl HostConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_ERROR` for malformed TOML or mistyped keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| helpers::config_error(err.to_string()))
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CONFIG_ERROR` when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            helpers::config_error(format!("Failed to read config file {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text).map_err(|err| err.context(path.display()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| helpers::config_error(err.to_string()))
    }

    /// Set the module path.
    #[must_use]
    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_path = Some(path.into());
        self
    }

    /// Module path to load.
    pub fn resolve_module_path(&self) -> Result<PathBuf> {
        match &self.module_path {
            Some(path) => Ok(path.clone()),
            None => default_module_path(),
        }
    }
}

/// [`DEFAULT_MODULE_FILE_NAME`] in the directory of the running executable.
pub fn default_module_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|err| helpers::config_error(format!("cannot locate executable: {err}")))?;
    let dir = exe
        .parent()
        .ok_or_else(|| helpers::config_error(format!("{} has no parent directory", exe.display())))?;
    Ok(dir.join(DEFAULT_MODULE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use dapper_error::codes;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert!(config.stack_control);
        assert_eq!(config.exception_message_limit, 500);
        assert!(!config.trace_transport);
        let path = config.resolve_module_path().unwrap();
        assert!(path.ends_with(DEFAULT_MODULE_FILE_NAME));
    }

    #[test]
    fn test_partial_document() {
        let config = HostConfig::from_toml_str("stack_control = false\nmodule_path = \"m.wasm\"").unwrap();
        assert!(!config.stack_control);
        assert_eq!(config.exception_message_limit, DEFAULT_EXCEPTION_MESSAGE_LIMIT);
        assert_eq!(config.resolve_module_path().unwrap(), PathBuf::from("m.wasm"));
    }

    #[test]
    fn test_bad_document() {
        let err = HostConfig::from_toml_str("stack_control = \"yes\"").unwrap_err();
        assert_eq!(err.code, codes::CONFIG_ERROR);
    }

    #[test]
    fn test_file_round_trip() {
        let config = HostConfig::default().with_module_path("probe.wasm");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();
        assert_eq!(HostConfig::from_file(file.path()).unwrap(), config);
        let missing = HostConfig::from_file(Path::new("/nonexistent/dapper.toml")).unwrap_err();
        assert_eq!(missing.code, codes::CONFIG_ERROR);
    }
}
