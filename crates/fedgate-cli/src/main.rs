//! FedGate CLI: command-line interface for the FedGate RPC gateway.
//!
//! `fedgate start` runs a node. The other commands boot an in-process kernel
//! from the same configuration and exit when done.

mod cli;
mod cmd;
mod ui;

use crate::cli::*;
use clap::{CommandFactory, Parser};
use fedgate_kernel::error::KernelError;
use fedgate_kernel::FedGateKernel;
use std::path::PathBuf;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for JSON output.
fn init_tracing(json: bool) {
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Start => cmd::node::cmd_start(cli.config),
        Commands::Route { addr, json } => cmd::call::cmd_route(cli.config, addr, json),
        Commands::Call {
            addr,
            key,
            data,
            task_id,
        } => cmd::call::cmd_call(cli.config, addr, &key, &data, &task_id),
        Commands::Config(sub) => match sub {
            ConfigCommands::Show => cmd::config::cmd_config_show(cli.config),
            ConfigCommands::Path => cmd::config::cmd_config_path(cli.config),
            ConfigCommands::Routes { json } => cmd::config::cmd_config_routes(cli.config, json),
        },
        Commands::Completion { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "fedgate", &mut std::io::stdout());
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Print a boot failure with a suggested fix.
pub(crate) fn boot_kernel_error(e: &KernelError) {
    match e {
        KernelError::Config(msg) => ui::error_with_fix(
            &format!("Invalid configuration: {msg}"),
            "Check your config.toml: fedgate config show",
        ),
        KernelError::Wire(err) => ui::error_with_fix(
            &format!("Transport setup failed: {err}"),
            "Check the [transport] section and listen addresses",
        ),
        other => ui::error(&other.to_string()),
    }
}

/// Boot the kernel or exit with an explanation.
pub(crate) fn boot_kernel(config: Option<PathBuf>) -> FedGateKernel {
    match FedGateKernel::boot(config.as_deref()) {
        Ok(k) => k,
        Err(e) => {
            boot_kernel_error(&e);
            std::process::exit(1);
        }
    }
}
