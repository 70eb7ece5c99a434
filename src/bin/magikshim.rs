//! magikshim - create-path diagnostics
//!
//! Runs the decision part of the create path against a bundle on disk
//! without creating anything, so an operator can see what the shim would do.
//!
//! ## Usage
//!
//! ```sh
//! magikshim inspect <container-id> --bundle <path> [--netns <path>] [--terminal]
//! magikshim config [--config <path>]
//! magikshim version
//! ```

use magikshim::config::{ConfigResolver, load_runtime_config};
use magikshim::options::{DecodedOptions, RuntimeOptions};
use magikshim::{classify, load_bundle, normalize_spec, output_disabled};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Environment variable switching logs to debug level.
const DEBUG_ENV_VAR: &str = "MAGIKSHIM_DEBUG";

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    Inspect {
        id: String,
        bundle: PathBuf,
        netns: String,
        terminal: bool,
    },
    Config {
        config: Option<PathBuf>,
    },
    Version,
    Help,
}

fn flag_value(args: &[String], names: &[&str]) -> Result<Option<String>, String> {
    match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(i) => args
            .get(i + 1)
            .cloned()
            .map(Some)
            .ok_or_else(|| format!("{} requires a value", names[0])),
        None => Ok(None),
    }
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "inspect" => {
            if args.len() < 3 {
                return Err("inspect requires <container-id>".to_string());
            }
            let rest = &args[3..];
            let bundle = flag_value(rest, &["--bundle", "-b"])?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let netns = flag_value(rest, &["--netns", "-n"])?.unwrap_or_default();
            let terminal = rest.iter().any(|a| a == "--terminal" || a == "-t");
            Ok(Command::Inspect {
                id: args[2].clone(),
                bundle,
                netns,
                terminal,
            })
        }
        "config" => Ok(Command::Config {
            config: flag_value(&args[2..], &["--config", "-c"])?.map(PathBuf::from),
        }),
        "version" | "--version" | "-v" => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        unknown => Err(format!("unknown command: {}", unknown)),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_inspect(id: String, bundle: PathBuf, netns: String, terminal: bool) -> Result<(), String> {
    let loaded = load_bundle(&id, &bundle).map_err(|e| e.to_string())?;
    let mut spec = loaded.spec;

    normalize_spec(&mut spec, &netns);
    let container_type = classify(&spec).map_err(|e| e.to_string())?;

    let summary = serde_json::json!({
        "id": id,
        "bundle": loaded.path,
        "type": container_type,
        "disableOutput": output_disabled(terminal, spec.process_terminal()),
        "sandboxId": magikshim::classify::sandbox_id_annotation(&spec),
        "namespaces": spec.namespaces(),
    });

    let out = serde_json::to_string_pretty(&summary).map_err(|e| format!("serialize: {}", e))?;
    println!("{out}");
    Ok(())
}

fn cmd_config(config: Option<PathBuf>) -> Result<(), String> {
    let options = config.map(|p| {
        DecodedOptions::Runtime(RuntimeOptions {
            type_url: String::new(),
            config_path: p.to_string_lossy().to_string(),
        })
    });

    let source = ConfigResolver::from_env()
        .select(options.as_ref())
        .map_err(|e| e.to_string())?;
    let runtime_config = load_runtime_config(source.path()).map_err(|e| e.to_string())?;

    let out = toml::to_string_pretty(&runtime_config).map_err(|e| format!("serialize: {}", e))?;
    println!("# source: {source}");
    print!("{out}");
    Ok(())
}

fn cmd_version() {
    println!("magikshim version {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_help() {
    println!(
        r#"magikshim - create-path diagnostics

USAGE:
    magikshim <command> [options]

COMMANDS:
    inspect <id>    Load, normalize and classify a bundle
        --bundle, -b <path>    Bundle directory (default: .)
        --netns, -n <path>     Network namespace to inject
        --terminal, -t         Caller attaches a terminal

    config          Resolve and print the runtime configuration
        --config, -c <path>    Explicit configuration file

    version         Print version
    help            Print this help

ENVIRONMENT:
    MAGIKSHIM_CONF_FILE    Configuration file used when --config is absent
    MAGIKSHIM_DEBUG        Enable debug logging
"#
    );
}

fn init_logging() {
    let level = if std::env::var_os(DEBUG_ENV_VAR).is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

fn main() -> ExitCode {
    init_logging();

    match parse_args() {
        Ok(cmd) => {
            let result = match cmd {
                Command::Inspect {
                    id,
                    bundle,
                    netns,
                    terminal,
                } => cmd_inspect(id, bundle, netns, terminal),
                Command::Config { config } => cmd_config(config),
                Command::Version => {
                    cmd_version();
                    Ok(())
                }
                Command::Help => {
                    cmd_help();
                    Ok(())
                }
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            cmd_help();
            ExitCode::FAILURE
        }
    }
}
