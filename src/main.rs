//! ci-lifecycle
//!
//! Entry point for the lifecycle actions and the emulator termination
//! routine.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ci_lifecycle::commands::{
    config_for_phase, EmulatorCommand, SecretFileCommand, TerminateEmulatorsCommand,
};
use ci_lifecycle::core::config::CONFIG_ENV_VAR;
use ci_lifecycle::core::{
    CiPlatform, GithubActionsPlatform, LifecycleConfig, LifecycleError, Phase, VERSION,
};
use ci_lifecycle::emulator::ADB_HOME_VAR;

/// Runner-provided scratch directory, cleaned between jobs
const RUNNER_TEMP_VAR: &str = "RUNNER_TEMP";

#[derive(Parser)]
#[command(name = "ci-lifecycle", version, about = "Pre/post lifecycle helpers for CI jobs")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and boot an Android emulator, or stop it in the post step
    Emulator,
    /// Write a secret to a file, or delete it in the post step
    SecretFile,
    /// Stop running emulators through adb, killing them if adb hangs
    TerminateEmulators(TerminateArgs),
}

#[derive(clap::Args)]
struct TerminateArgs {
    /// Directory containing adb
    #[arg(long, env = ADB_HOME_VAR)]
    adb_home: PathBuf,

    /// Serial of the emulator to stop, e.g. emulator-5554
    #[arg(long, requires = "avd_name")]
    emulator_serial: Option<String>,

    /// AVD name of the emulator to stop
    #[arg(long, requires = "emulator_serial")]
    avd_name: Option<String>,

    /// Per-command timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging depends on the config, so config errors are reported after init
    let config = LifecycleConfig::resolve(cli.config.as_deref(), None).await;
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    info!("ci-lifecycle v{} starting", VERSION);

    match cli.command {
        Command::Emulator => {
            let platform = GithubActionsPlatform::from_process_env();
            let Some(config) = config_or_fail(config, &platform) else {
                return ExitCode::FAILURE;
            };
            let command = EmulatorCommand {
                config: config.emulator,
                program: current_program(),
            };
            exit_code(command.execute(&platform).await.succeeded && !platform.failed())
        }
        Command::SecretFile => {
            let platform = GithubActionsPlatform::from_process_env();
            if config_or_fail(config, &platform).is_none() {
                return ExitCode::FAILURE;
            }
            let command = SecretFileCommand {
                temp_dir: std::env::var_os(RUNNER_TEMP_VAR)
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from),
            };
            exit_code(command.execute(&platform).await.succeeded && !platform.failed())
        }
        Command::TerminateEmulators(args) => {
            // Only ever runs as part of emulator teardown
            let config = config_for_phase(config, Phase::Teardown).unwrap_or_default();
            let command = TerminateEmulatorsCommand {
                adb_home: args.adb_home,
                emulator_serial: args.emulator_serial,
                avd_name: args.avd_name,
                timeout: Duration::from_secs(
                    args.timeout_secs
                        .unwrap_or(config.emulator.termination_timeout_secs),
                ),
            };
            match command.execute().await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Emulator termination failed: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Config for a lifecycle invocation, or `None` after reporting the failure
fn config_or_fail(
    loaded: Result<LifecycleConfig, LifecycleError>,
    platform: &dyn CiPlatform,
) -> Option<LifecycleConfig> {
    match config_for_phase(loaded, Phase::detect(platform)) {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            platform.set_failed(&e.to_string());
            None
        }
    }
}

/// Log to stderr; stdout carries workflow commands for the runner.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// This executable, so teardown can re-enter it for termination
fn current_program() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from("ci-lifecycle"))
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
