//! Log operation for the Dapper module host.
//!
//! This module provides the record passed to log handlers.

use crate::level::LogLevel;

/// Component id attached to text the hosted module writes to stdout/stderr
pub const MODULE_COMPONENT_ID: &str = "module";

/// Log operation from the hosted module or the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOperation {
    /// Log level
    pub level:        LogLevel,
    /// Log message
    pub message:      String,
    /// Component ID (optional)
    pub component_id: Option<String>,
}

impl LogOperation {
    /// Create a new log operation
    #[must_use]
    pub const fn new(level: LogLevel, message: String) -> Self {
        Self { level, message, component_id: None }
    }

    /// Create a new log operation with a component ID
    pub fn with_component<S1: Into<String>, S2: Into<String>>(
        level: LogLevel,
        message: S1,
        component_id: S2,
    ) -> Self {
        Self { level, message: message.into(), component_id: Some(component_id.into()) }
    }

    /// Record for text the module wrote to one of its console descriptors
    #[must_use]
    pub fn module_output(level: LogLevel, text: &str) -> Self {
        Self::with_component(level, text.trim_end_matches('\n'), MODULE_COMPONENT_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_operation_creation() {
        let op = LogOperation::new(LogLevel::Info, "test message".to_string());
        assert_eq!(op.level, LogLevel::Info);
        assert!(op.component_id.is_none());

        let op = LogOperation::with_component(LogLevel::Debug, "test message", "probe-1");
        assert_eq!(op.component_id, Some("probe-1".to_string()));
    }

    #[test]
    fn test_module_output_strips_newline() {
        let op = LogOperation::module_output(LogLevel::Error, "fault\n");
        assert_eq!(op.message, "fault");
        assert_eq!(op.component_id.as_deref(), Some(MODULE_COMPONENT_ID));
    }
}
