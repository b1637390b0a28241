/*!
 * Uplink CLI - remote control utility for the uplink service
 */

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use uplink::config::{ControlConfig, LogLevel, DEFAULT_CONFIG_PATH};
use uplink::error::{Result, UplinkError, EXIT_SUCCESS};
use uplink::{logging, run_command};

#[derive(Parser)]
#[command(name = "uplink")]
#[command(version, about = "Remote control utility for the uplink service", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server address, ip or ip@port; if omitted the config is used
    #[arg(short = 's', long = "server", value_name = "ADDR[@PORT]")]
    server: Option<String>,

    /// Log level for diagnostics on stderr
    #[arg(long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,

    /// Log file path (default: stderr)
    #[arg(long = "log", value_name = "FILE")]
    log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Command sent to the server; "start" launches the service instead
    #[arg(value_name = "COMMAND", required = true, num_args = 1..)]
    command: Vec<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let (config_path, explicit) = match cli.config {
        Some(ref path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut config = ControlConfig::load(&config_path, explicit)?;

    // CLI overrides the config file
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose = config.verbose || cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    if cli.command.len() == 1 && cli.command[0] == "start" {
        return start_server(&config_path);
    }

    // One opaque line on the wire; the response goes to stdout verbatim.
    let payload = format!("{}\n", cli.command.join(" "));
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_command(&config, cli.server.as_deref(), payload.as_bytes(), &mut out)?;

    Ok(())
}

/// Replace this process with the service, as `uplinkd -c <config>`.
#[cfg(unix)]
fn start_server(config_path: &Path) -> Result<()> {
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    let err = Command::new("uplinkd").arg("-c").arg(config_path).exec();
    // exec only returns on failure
    Err(UplinkError::Io(std::io::Error::new(
        err.kind(),
        format!("could not exec uplinkd: {}", err),
    )))
}

#[cfg(not(unix))]
fn start_server(_config_path: &Path) -> Result<()> {
    Err(UplinkError::Config(
        "the start command is only supported on unix".to_string(),
    ))
}
