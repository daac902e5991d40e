use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing::info;

use azqmon::{
    connect, events, logging, ConfigError, HistoryExporter, MonitorError, Overrides, PollLoop,
    Settings, TerminalRenderer, TerminalSession,
};

/// Exit codes reported to the shell.
mod exit {
    pub const NO_OPTIONS: u8 = 1;
    pub const MISSING_CONNECTION_STRING: u8 = 2;
    pub const CONFIG: u8 = 3;
    pub const MONITOR: u8 = 4;
}

#[derive(Parser, Debug)]
#[command(name = "azqmon", version)]
#[command(about = "Live terminal dashboard for Azure Storage queue message counts")]
struct Args {
    /// Title shown in the header and the terminal window
    #[arg(short, long)]
    title: Option<String>,

    /// Azure Storage connection string, or file:<path> for a JSON file of counts
    #[arg(long, alias = "connectionstring", value_name = "CONNECTION_STRING")]
    connection_string: Option<String>,

    /// Interval between polls in milliseconds [default: 2000]
    #[arg(short, long, alias = "pollinginterval", value_name = "MS")]
    polling_interval: Option<u64>,

    /// Configuration file (JSON, TOML or YAML, detected from the extension)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Append queue counts to a CSV file every cycle
    #[arg(short, long)]
    export: bool,

    /// Directory for CSV exports [default: documents directory]
    #[arg(long, value_name = "DIR")]
    export_path: Option<PathBuf>,

    /// Show queues that have been empty since tracking started
    #[arg(long)]
    show_empty: bool,

    /// Order queues by message count instead of name
    #[arg(long)]
    order_by_size: bool,

    /// Write logs to this file (level from RUST_LOG, default info)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            title: self.title.clone(),
            connection_string: self.connection_string.clone(),
            poll_interval_ms: self.polling_interval,
            export: self.export,
            export_path: self.export_path.clone(),
            show_empty: self.show_empty,
            order_by_size: self.order_by_size,
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 && !configured_by_env() {
        let _ = Args::command().print_help();
        return ExitCode::from(exit::NO_OPTIONS);
    }

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(exit::CONFIG);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Whether any `AZQMON_*` variable could supply the configuration.
fn configured_by_env() -> bool {
    std::env::vars_os().any(|(key, _)| key.to_string_lossy().starts_with("AZQMON_"))
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::MissingConnectionString) => exit::MISSING_CONNECTION_STRING,
        Some(_) => exit::CONFIG,
        None => match err.downcast_ref::<MonitorError>() {
            Some(MonitorError::Config(ConfigError::MissingConnectionString)) => {
                exit::MISSING_CONNECTION_STRING
            }
            Some(MonitorError::Config(_)) => exit::CONFIG,
            _ => exit::MONITOR,
        },
    }
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;
    let config = settings.validate()?;

    let _log_guard = logging::init(config.log_file.as_deref())
        .map_err(|e| ConfigError::LogFile(e.to_string()))?;

    let source = connect(&config.connection_string)?;
    info!("Monitoring {}", source.description());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;

    let session = TerminalSession::enter(&config.poll.title).map_err(MonitorError::Render)?;
    let renderer = TerminalRenderer::stdout().map_err(MonitorError::Render)?;

    let cancel = CancellationToken::new();
    let keys = events::spawn_key_listener(cancel.clone());

    let mut poll = PollLoop::new(
        source,
        Box::new(renderer),
        Arc::new(config.rules),
        config.poll,
    );
    if let Some(dir) = config.export_dir {
        poll = poll.with_exporter(HistoryExporter::new(dir));
    }

    let result = runtime.block_on(async {
        tokio::spawn(events::cancel_on_ctrl_c(cancel.clone()));
        poll.run(cancel.clone()).await
    });

    cancel.cancel();
    let _ = keys.join();
    drop(session);

    let stats = result?;
    info!(
        "Finished after {} cycles ({} resets)",
        stats.cycles, stats.resets
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn legacy_option_names_are_accepted() {
        let args = Args::try_parse_from([
            "azqmon",
            "--connectionstring",
            "file:queues.json",
            "--pollinginterval",
            "500",
            "-t",
            "Staging",
        ])
        .unwrap();

        assert_eq!(args.connection_string.as_deref(), Some("file:queues.json"));
        assert_eq!(args.polling_interval, Some(500));
        assert_eq!(args.title.as_deref(), Some("Staging"));
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        assert!(Args::try_parse_from(["azqmon", "-p", "soon"]).is_err());
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let missing = anyhow::Error::from(ConfigError::MissingConnectionString);
        assert_eq!(exit_code(&missing), exit::MISSING_CONNECTION_STRING);

        let invalid = anyhow::Error::from(ConfigError::InvalidInterval);
        assert_eq!(exit_code(&invalid), exit::CONFIG);

        let render = anyhow::Error::from(MonitorError::Render(std::io::Error::other("gone")));
        assert_eq!(exit_code(&render), exit::MONITOR);
    }
}
