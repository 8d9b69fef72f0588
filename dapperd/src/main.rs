//! # Dapper command-line front end (dapperd)
//!
//! Loads a probe firmware module into the Dapper module host and inspects or
//! calls what it registered.
//!
//! ## Usage
//!
//! ```bash
//! dapperd [--module <wasm>] [--config <toml>] [--no-stack-control] <command>
//! ```
//!
//! Commands:
//! - `functions` lists the embind functions the module registered
//! - `types` lists the registered types
//! - `call <name> [args...]` calls a function; arguments are parsed as
//!   booleans, `null`, integers (decimal or `0x` hex), floats or strings
//!
//! Logging follows `RUST_LOG` and `RUST_LOG_FORMAT` (`json`, `compact` or
//! `pretty`).

#![warn(missing_docs)]

use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dapper::{HostConfig, ModuleHost, Value};
use dapper_logging::{log_facade_handler, LoggingExt};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Dapper command-line arguments
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Module to load; defaults to the config file's module or the file
    /// beside the executable
    #[arg(short, long, env = "DAPPER_MODULE")]
    module: Option<PathBuf>,

    /// TOML host configuration
    #[arg(short, long, env = "DAPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Do not save and restore the module stack around trampolines
    #[arg(long)]
    no_stack_control: bool,

    /// Log every transport packet
    #[arg(long)]
    trace_transport: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List registered functions and their signatures
    Functions,
    /// Call a registered function
    Call {
        /// Exposed function name
        name: String,
        /// Arguments, in declaration order
        args: Vec<String>,
    },
    /// List registered types
    Types,
}

fn main() -> Result<()> {
    initialize_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut host = start_host(config)?;

    match &args.command {
        Command::Functions => {
            for name in host.function_names() {
                match host.function_signature(&name) {
                    Some(signature) => println!("{signature}"),
                    None => println!("{name} (unbound types)"),
                }
            }
        }
        Command::Types => {
            for (raw_type, name) in host.registered_types() {
                println!("{raw_type:>6}  {name}");
            }
        }
        Command::Call { name, args } => {
            let values: Vec<Value> = args.iter().map(|arg| parse_arg(arg)).collect();
            debug!("calling {name} with {values:?}");
            let result = host.call(name, &values).with_context(|| format!("Failed to call {name}"))?;
            println!("{result}");
        }
    }

    Ok(())
}

/// Initialize the tracing system for logging
fn initialize_tracing() {
    let format = env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format.as_str() {
        "json" => subscriber.json().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.pretty().init(),
    }
}

/// Host configuration from the config file with command-line overrides
fn load_config(args: &Args) -> Result<HostConfig> {
    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(module) = &args.module {
        config.module_path = Some(module.clone());
    }
    if args.no_stack_control {
        config.stack_control = false;
    }
    if args.trace_transport {
        config.trace_transport = true;
    }
    Ok(config)
}

/// Load and initialize the module, forwarding its output to the log
fn start_host(config: HostConfig) -> Result<ModuleHost> {
    let mut host = ModuleHost::new(config).context("Failed to load module")?;
    host.callbacks_mut().register_log_handler(log_facade_handler());
    host.initialize().context("Failed to initialize module")?;
    info!("module ready with {} functions", host.function_names().len());
    Ok(host)
}

/// Parse one command-line argument into a host value
fn parse_arg(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        "undefined" => return Value::Undefined,
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if let Ok(number) = i64::from_str_radix(hex, 16) {
            return Value::Int(number);
        }
    }
    if let Ok(number) = text.parse::<i64>() {
        return Value::Int(number);
    }
    if let Ok(number) = text.parse::<f64>() {
        return Value::Float(number);
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("42"), Value::Int(42));
        assert_eq!(parse_arg("-7"), Value::Int(-7));
        assert_eq!(parse_arg("0xE000ED00"), Value::Int(0xE000_ED00));
        assert_eq!(parse_arg("1.5"), Value::Float(1.5));
        assert_eq!(parse_arg("true"), Value::Bool(true));
        assert_eq!(parse_arg("null"), Value::Null);
        assert_eq!(parse_arg("0xZZ"), Value::String("0xZZ".into()));
        assert_eq!(parse_arg("hello"), Value::String("hello".into()));
    }

    #[test]
    fn test_call_command() {
        let args = Args::try_parse_from(["dapperd", "--module", "probe.wasm", "call", "add", "2", "3"]).unwrap();
        assert_eq!(args.module, Some(PathBuf::from("probe.wasm")));
        assert_eq!(
            args.command,
            Command::Call {
                name: "add".into(),
                args: vec!["2".into(), "3".into()],
            }
        );
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::try_parse_from(["dapperd", "--module", "m.wasm", "--no-stack-control", "types"]).unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.module_path, Some(PathBuf::from("m.wasm")));
        assert!(!config.stack_control);
        assert!(!config.trace_transport);
    }
}
