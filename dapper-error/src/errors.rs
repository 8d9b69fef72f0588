// Dapper - dapper-error
// Module: Dapper Error Types
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Categorized error type shared by every Dapper crate.

use core::fmt;

use crate::codes;

/// `Error` categories for Dapper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Value conversion between host and module representations
    Marshaling     = 1,
    /// Calls into or out of the module
    Call           = 2,
    /// Linear memory access
    Memory         = 3,
    /// Module loading and lifecycle
    Initialization = 4,
    /// Errors raised by the module itself
    Module         = 5,
    /// Device transport and console I/O
    Io             = 6,
    /// Parameter validation
    Parameter      = 7,
    /// Host-side system failures
    System         = 8,
    /// Operations the host deliberately does not implement
    NotImplemented = 9,
}

/// Base trait for all error types
pub trait ErrorSource: fmt::Debug + Send + Sync {
    /// Get the error code
    fn code(&self) -> u16;

    /// Get the error message
    fn message(&self) -> &str;

    /// Get the error category
    fn category(&self) -> ErrorCategory;
}

/// Type name and message extracted from a module-thrown exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleException {
    /// Demangled exception type name as reported by the module
    pub type_name: String,
    /// `what()` text, or the type name when the module reports none
    pub message:   String,
}

/// Dapper `Error` type
///
/// Carries a category, a numeric code from [`codes`] and a message. Errors
/// raised by a module's `__cxa_throw` also carry the extracted exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// `Error` category
    pub category:  ErrorCategory,
    /// `Error` code
    pub code:      u16,
    /// `Error` message
    pub message:   String,
    /// Module exception details, if the module threw
    pub exception: Option<Box<ModuleException>>,
}

impl Error {
    /// Create a new error.
    #[must_use]
    pub fn new(category: ErrorCategory, code: u16, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            exception: None,
        }
    }

    /// Create an error for an exception thrown by the module.
    #[must_use]
    pub fn module_exception(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let exception = ModuleException {
            type_name: type_name.into(),
            message:   message.into(),
        };
        let mut error = Self::new(
            ErrorCategory::Module,
            codes::MODULE_EXCEPTION,
            format!("{}: {}", exception.type_name, exception.message),
        );
        error.exception = Some(Box::new(exception));
        error
    }

    /// Exception details when the module threw
    #[must_use]
    pub fn exception(&self) -> Option<&ModuleException> {
        self.exception.as_deref()
    }

    /// Check if this is a marshaling error
    #[must_use]
    pub fn is_marshaling_error(&self) -> bool {
        self.category == ErrorCategory::Marshaling
    }

    /// Check if this is a memory error
    #[must_use]
    pub fn is_memory_error(&self) -> bool {
        self.category == ErrorCategory::Memory
    }

    /// Check if the module itself raised this error
    #[must_use]
    pub fn is_module_error(&self) -> bool {
        self.category == ErrorCategory::Module
    }

    /// Check if this is a transport or console I/O error
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        self.category == ErrorCategory::Io
    }

    /// Prefix the message with additional context, keeping code and category.
    #[must_use]
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl ErrorSource for Error {
    fn code(&self) -> u16 {
        self.code
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}][E{:04X}] {}", self.category, self.code, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorCategory::Io, codes::TRANSPORT_ERROR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let err = Error::new(ErrorCategory::Call, codes::UNSUPPORTED_ARITY, "arity 4");
        assert_eq!(err.to_string(), "[Call][E07D1] arity 4");
    }

    #[test]
    fn test_module_exception_keeps_pair() {
        let err = Error::module_exception("std::runtime_error", "boom");
        assert_eq!(err.code, codes::MODULE_EXCEPTION);
        assert!(err.is_module_error());
        let exception = err.exception().unwrap();
        assert_eq!(exception.type_name, "std::runtime_error");
        assert_eq!(exception.message, "boom");
        assert_eq!(err.message, "std::runtime_error: boom");
    }

    #[test]
    fn test_context_prefixes_message() {
        let err = Error::new(ErrorCategory::Memory, codes::MEMORY_OUT_OF_BOUNDS, "read 4 bytes")
            .context("reading struct field");
        assert_eq!(err.message, "reading struct field: read 4 bytes");
        assert_eq!(err.code, codes::MEMORY_OUT_OF_BOUNDS);
    }
}
