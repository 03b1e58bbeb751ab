// crates/gallery-validation-cli/src/main.rs
// ============================================================================
// Module: Gallery Validation CLI Entry Point
// Description: Command dispatcher for configuration checks and local runs.
// Purpose: Verify pipeline configuration and drive a validation pass locally.
// Dependencies: clap, gallery-validation-cli, gallery-validation-config, tokio
// ============================================================================

//! ## Overview
//! `config validate` performs the same startup verification as a host: the
//! configuration is loaded, every validator is constructed, and the step
//! graphs are checked against the registry. The configured state store is
//! not opened. `config plan` prints the legal
//! execution order per content type. `pipeline dry-run` creates one
//! validation set for a seeded package and runs a single processing pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use gallery_validation_cli::runtime::RuntimeServices;
use gallery_validation_cli::runtime::build_orchestrator;
use gallery_validation_cli::runtime::verify_wiring;
use gallery_validation_config::OrchestratorConfig;
use gallery_validation_core::ContentType;
use gallery_validation_core::PackageId;
use gallery_validation_core::PackageKey;
use gallery_validation_core::PackageMetadata;
use gallery_validation_core::PackageValidationInput;
use gallery_validation_core::PackageVersion;
use gallery_validation_core::SystemClock;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "gallery-validation", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Local pipeline execution.
    Pipeline {
        /// Selected pipeline subcommand.
        #[command(subcommand)]
        command: PipelineCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file and the validator wiring it implies.
    Validate(ConfigArgs),
    /// Print the execution order of each content type.
    Plan(ConfigArgs),
}

/// Pipeline subcommands.
#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Create a validation set and run one processing pass.
    DryRun(DryRunCommand),
}

/// Shared configuration path argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `pipeline dry-run`.
#[derive(Args, Debug)]
struct DryRunCommand {
    /// Configuration path.
    #[command(flatten)]
    config: ConfigArgs,
    /// Content type whose steps apply.
    #[arg(long, value_name = "NAME")]
    content_type: String,
    /// Gallery package key.
    #[arg(long, value_name = "KEY")]
    package_key: NonZeroU64,
    /// Package identifier.
    #[arg(long, value_name = "ID")]
    package_id: String,
    /// Package version.
    #[arg(long, value_name = "VERSION")]
    package_version: String,
    /// Package owner usernames.
    #[arg(long = "owner", value_name = "USERNAME")]
    owners: Vec<String>,
    /// Artifact URL.
    #[arg(long, value_name = "URL")]
    nupkg_url: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
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
    match cli.command {
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Pipeline {
            command,
        } => match command {
            PipelineCommand::DryRun(command) => command_dry_run(&command).await,
        },
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => command_config_validate(args),
        ConfigCommand::Plan(args) => command_config_plan(args),
    }
}

/// Executes the config validation command without opening the state store.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let services = runtime_services(&config)?;
    verify_wiring(&config, &services)
        .map_err(|err| CliError::new(format!("runtime wiring failed: {err}")))?;
    write_stdout_line("ok")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the execution plan command.
fn command_config_plan(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let plans = config
        .execution_plan()
        .map_err(|err| CliError::new(format!("failed to order steps: {err}")))?;
    for plan in plans {
        let steps: Vec<&str> = plan.steps.iter().map(|step| step.as_str()).collect();
        write_stdout_line(&format!("{}: {}", plan.content_type, steps.join(" -> ")))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Pipeline Commands
// ============================================================================

/// Executes one processing pass for a seeded package.
async fn command_dry_run(command: &DryRunCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let services = runtime_services(&config)?;
    let orchestrator = build_orchestrator(&config, &services)
        .map_err(|err| CliError::new(format!("runtime wiring failed: {err}")))?;
    let package_key = PackageKey::new(command.package_key);
    let package_id = PackageId::new(&command.package_id);
    let package_version = PackageVersion::new(&command.package_version);
    services
        .metadata
        .insert(PackageMetadata {
            key: package_key,
            id: package_id.clone(),
            version: package_version.clone(),
            owners: command.owners.clone(),
        })
        .map_err(|err| CliError::new(err.to_string()))?;

    let set = orchestrator
        .create_set(PackageValidationInput {
            content_type: ContentType::new(&command.content_type),
            package_key,
            package_id,
            package_version,
            nupkg_url: command.nupkg_url.clone(),
        })
        .await
        .map_err(|err| CliError::new(format!("failed to create validation set: {err}")))?;
    let report = orchestrator
        .process(&set.set_id)
        .await
        .map_err(|err| CliError::new(format!("processing failed: {err}")))?;

    let summary = json!({
        "set_id": set.set_id.to_string(),
        "validation_id": set.validation_id.to_string(),
        "outcome": report.outcome.as_str(),
        "started": report.started.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "issues": report.issues.len(),
        "messages": services
            .queue
            .messages()
            .iter()
            .map(|message| message.topic.as_str())
            .collect::<Vec<_>>(),
    });
    write_stdout_line(&summary.to_string())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the configuration.
fn load_config(args: &ConfigArgs) -> CliResult<OrchestratorConfig> {
    OrchestratorConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Builds runtime services using the configured log sink and the system clock.
fn runtime_services(config: &OrchestratorConfig) -> CliResult<RuntimeServices> {
    let log = config
        .logging
        .build_sink()
        .map_err(|err| CliError::new(format!("failed to open log sink: {err}")))?;
    Ok(RuntimeServices::new(log, Arc::new(SystemClock)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
