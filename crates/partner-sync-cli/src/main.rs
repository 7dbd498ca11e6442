// crates/partner-sync-cli/src/main.rs
// ============================================================================
// Module: Partner Sync CLI Entry Point
// Description: Command dispatcher for the partner sync engine.
// Purpose: Run consumers, inspect the sync log, and recover stuck splits.
// Dependencies: clap, partner-sync-broker, partner-sync-config, tokio
// ============================================================================

//! ## Overview
//! `partner-sync serve` binds every durable consumer and drives the handler
//! engine until interrupted. `logs`, `report`, and `recover` operate on the
//! durable sync log; `config check` and `config example` help operators
//! prepare `partner-sync.toml`. Query output is JSON on stdout; operator
//! messages and errors go to stderr.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use partner_sync_broker::JetStreamPublisher;
use partner_sync_broker::JetStreamTransport;
use partner_sync_broker::SubscriptionManager;
use partner_sync_cli::render::LogView;
use partner_sync_cli::render::RecoveryView;
use partner_sync_cli::render::report_json;
use partner_sync_cli::render::to_json;
use partner_sync_cli::runtime::build_engine;
use partner_sync_cli::runtime::date_range;
use partner_sync_cli::runtime::open_durable_store;
use partner_sync_cli::runtime::open_store;
use partner_sync_cli::runtime::open_telemetry;
use partner_sync_cli::runtime::recovery;
use partner_sync_config::PartnerSyncConfig;
use partner_sync_config::StoreConfig;
use partner_sync_config::config_toml_example;
use partner_sync_core::Clock;
use partner_sync_core::Signature;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SystemClock;
use partner_sync_core::status_report;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "partner-sync", version, disable_help_subcommand = true)]
struct Cli {
    /// Optional config file path (defaults to partner-sync.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind every durable consumer and process deliveries until interrupted.
    Serve,
    /// Show the sync log and splits recorded for a partner signature.
    Logs(LogsCommand),
    /// Count splits per day and status over a date range.
    Report(RangeArgs),
    /// Republish or abandon unfinished splits created in a date range.
    Recover(RangeArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `logs`.
#[derive(Args, Debug)]
struct LogsCommand {
    /// Partner batch signature.
    #[arg(long, value_name = "SIGNATURE")]
    signature: String,
}

/// Inclusive creation-date range.
#[derive(Args, Debug)]
struct RangeArgs {
    /// First day, `YYYY-MM-DD`.
    #[arg(long, value_name = "DATE")]
    from: String,
    /// Last day, `YYYY-MM-DD`.
    #[arg(long, value_name = "DATE")]
    to: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a partner-sync configuration file.
    Check,
    /// Print a canonical example configuration.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the operator.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve => command_serve(config_path).await,
        Commands::Logs(command) => command_logs(config_path, &command).await,
        Commands::Report(range) => command_report(config_path, &range).await,
        Commands::Recover(range) => command_recover(config_path, &range).await,
        Commands::Config {
            command,
        } => command_config(config_path, &command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let store = open_store_blocking(config.store.clone(), false).await?;
    store
        .readiness()
        .await
        .map_err(|err| CliError::new(format!("store not ready: {err}")))?;
    let telemetry =
        open_telemetry(&config.telemetry).map_err(|err| CliError::new(err.to_string()))?;
    let transport = JetStreamTransport::connect(&config.broker.url, config.broker.stream.clone())
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = build_engine(&config, store, Arc::new(transport.publisher()), telemetry, clock)
        .map_err(|err| CliError::new(err.to_string()))?;
    let manager = SubscriptionManager::new(
        Arc::new(transport),
        Arc::new(engine),
        config.consumer_policy(),
        config.subscription_specs(),
    );
    let running = manager.start().await.map_err(|err| CliError::new(err.to_string()))?;
    write_stderr_line(&format!(
        "partner-sync serving {} subscriptions on {}",
        running.len(),
        config.broker.url
    ))?;
    running.run_until(interrupted()).await;
    write_stderr_line("partner-sync stopped")?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C; never resolves when the signal cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Query Commands
// ============================================================================

/// Executes the `logs` command.
async fn command_logs(config_path: Option<&Path>, command: &LogsCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let signature = Signature::new(command.signature.trim());
    if signature.is_empty() {
        return Err(CliError::new("signature must be non-empty".to_string()));
    }
    let store = open_store_blocking(config.store.clone(), true).await?;
    let log = store
        .get_log_by_signature(&signature)
        .await
        .map_err(|err| CliError::new(err.to_string()))?
        .ok_or_else(|| CliError::new(format!("no sync log for signature {signature}")))?;
    let splits = store
        .splits_by_signature(&signature)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&to_json(&LogView::new(&log, &splits)).map_err(CliError::new)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `report` command.
async fn command_report(config_path: Option<&Path>, range: &RangeArgs) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let range =
        date_range(&config, &range.from, &range.to).map_err(|err| CliError::new(err.to_string()))?;
    let store = open_store_blocking(config.store.clone(), true).await?;
    let report = status_report(store.as_ref(), range)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&report_json(&report).map_err(CliError::new)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `recover` command.
///
/// Exits with failure when any split could not be republished.
async fn command_recover(config_path: Option<&Path>, range: &RangeArgs) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let range =
        date_range(&config, &range.from, &range.to).map_err(|err| CliError::new(err.to_string()))?;
    let store = open_store_blocking(config.store.clone(), true).await?;
    let publisher = JetStreamPublisher::connect(&config.broker.url)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    let service = recovery(&config, store, Arc::new(publisher), Arc::new(SystemClock));
    let report = service.recover(range).await.map_err(|err| CliError::new(err.to_string()))?;
    let view = RecoveryView::from(report);
    write_stdout_line(&to_json(&view).map_err(CliError::new)?)?;
    if view.errors.is_empty() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(config_path: Option<&Path>, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check => {
            let config = load_config(config_path)?;
            write_stdout_line(&format!(
                "config ok: {} subscriptions, store {}",
                config.subscription_specs().len(),
                if config.store.sqlite().is_some() { "sqlite" } else { "memory" }
            ))?;
        }
        ConfigCommand::Example => write_stdout_line(config_toml_example().trim_end())?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<PartnerSyncConfig> {
    PartnerSyncConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured store off the async runtime.
async fn open_store_blocking(
    config: StoreConfig,
    durable: bool,
) -> CliResult<Arc<dyn SyncLogStore>> {
    tokio::task::spawn_blocking(move || {
        if durable { open_durable_store(&config) } else { open_store(&config) }
    })
    .await
    .map_err(|err| CliError::new(format!("store open join failed: {err}")))?
    .map_err(|err| CliError::new(err.to_string()))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stderr: {err}")))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
