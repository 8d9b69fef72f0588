//! Severity of module output and host diagnostics.
//!
//! Module stdout is reported at [`LogLevel::Info`] and stderr at
//! [`LogLevel::Error`]. Levels parse from their names without regard to
//! case, so they can come straight from a config file or the command line.

// Dapper - dapper-logging
// Module: Log Levels
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

use core::{fmt, str::FromStr};

use dapper_error::{helpers, Error};

/// How severe a [`LogOperation`](crate::LogOperation) is, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-transfer detail
    Trace,
    /// Host internals
    Debug,
    /// Module stdout
    Info,
    /// Recoverable oddities
    Warn,
    /// Module stderr
    Error,
    /// The module or the device can no longer be used
    Critical,
}

impl LogLevel {
    /// Every level, lowest first.
    pub const ALL: [Self; 6] = [Self::Trace, Self::Debug, Self::Info, Self::Warn, Self::Error, Self::Critical];

    /// Parse `name`, falling back to [`LogLevel::Info`].
    #[must_use]
    pub fn from_string_or_default(name: &str) -> Self {
        name.parse().unwrap_or(Self::Info)
    }

    /// Lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.eq_ignore_ascii_case("warning") {
            return Ok(Self::Warn);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| helpers::invalid_argument(format!("unknown log level '{name}'")))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `log` has no critical level; it shares [`log::Level::Error`].
impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error | LogLevel::Critical => Self::Error,
        }
    }
}
