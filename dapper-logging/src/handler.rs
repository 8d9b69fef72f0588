//! Log handler for the Dapper module host.
//!
//! This module attaches log handling to [`HostCallbacks`].

use dapper_host::{CallbackType, HostCallbacks};

use crate::operation::LogOperation;

/// Function type for handling log operations
pub type LogHandler = Box<dyn Fn(LogOperation) + Send + Sync>;

/// Extension trait for `HostCallbacks` to add logging-specific methods
pub trait LoggingExt {
    /// Register a log handler
    fn register_log_handler<F>(&mut self, handler: F)
    where
        F: Fn(LogOperation) + Send + Sync + 'static;

    /// Handle a log operation
    fn handle_log(&self, operation: LogOperation);

    /// Check if a log handler is registered
    fn has_log_handler(&self) -> bool;
}

impl LoggingExt for HostCallbacks {
    fn register_log_handler<F>(&mut self, handler: F)
    where
        F: Fn(LogOperation) + Send + Sync + 'static,
    {
        self.register_callback(CallbackType::Logging, Box::new(handler) as LogHandler);
    }

    fn handle_log(&self, operation: LogOperation) {
        if let Some(handler) = self.get_callback::<LogHandler>(&CallbackType::Logging) {
            handler(operation);
        }
    }

    fn has_log_handler(&self) -> bool {
        self.get_callback::<LogHandler>(&CallbackType::Logging).is_some()
    }
}

/// Handler that re-emits operations through the `log` facade.
///
/// The component id becomes the record target.
#[must_use]
pub fn log_facade_handler() -> impl Fn(LogOperation) + Send + Sync + 'static {
    |operation: LogOperation| {
        let target = operation.component_id.as_deref().unwrap_or("dapper");
        log::log!(target: target, log::Level::from(operation.level), "{}", operation.message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::level::LogLevel;

    #[test]
    fn test_logging_extension() {
        let mut callbacks = HostCallbacks::new();

        // Test without handler
        assert!(!callbacks.has_log_handler());

        // Logging without handler should not panic
        callbacks.handle_log(LogOperation::new(LogLevel::Info, "dropped".to_string()));

        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let received = received.clone();
            callbacks.register_log_handler(move |log_op| {
                received.lock().unwrap().push((log_op.level, log_op.message));
            });
        }

        assert!(callbacks.has_log_handler());

        callbacks.handle_log(LogOperation::new(LogLevel::Info, "info message".to_string()));
        callbacks.handle_log(LogOperation::module_output(LogLevel::Error, "error message\n"));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], (LogLevel::Info, "info message".to_string()));
        assert_eq!(received[1], (LogLevel::Error, "error message".to_string()));
    }

    #[test]
    fn test_log_facade_handler_accepts_operations() {
        let mut callbacks = HostCallbacks::new();
        callbacks.register_log_handler(log_facade_handler());
        callbacks.handle_log(LogOperation::module_output(LogLevel::Critical, "halt"));
        assert!(callbacks.has_log_handler());
    }
}
