//! Clap CLI definitions for FedGate.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  fedgate start                          Run the gateway node
  fedgate route 10000 host 9999 guest    Show where a call would be forwarded
  fedgate call 10000 host 9999 guest --data ping
                                         Forward one packet and print the reply
  fedgate config show                    Print the effective configuration";

/// FedGate: cross-organization RPC forwarding gateway.
#[derive(Parser, Debug)]
#[command(name = "fedgate", version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file (default: ~/.fedgate/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway node (RPC listener + HTTP tunnel ingress).
    Start,
    /// Resolve the route for a call without sending anything.
    Route {
        #[command(flatten)]
        addr: AddressArgs,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Build a packet and forward it through an in-process gateway.
    Call {
        #[command(flatten)]
        addr: AddressArgs,
        /// Body key of the packet.
        #[arg(long, default_value = "payload")]
        key: String,
        /// Body value of the packet (UTF-8).
        #[arg(long, default_value = "")]
        data: String,
        /// Task id recorded in the packet header.
        #[arg(long, default_value = "")]
        task_id: String,
    },
    /// Inspect configuration [*].
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completion scripts.
    Completion {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

/// Both endpoints of a call, plus an optional route header override.
#[derive(Args, Debug, Clone)]
pub struct AddressArgs {
    /// Calling party id.
    pub src_party: String,
    /// Calling party role.
    pub src_role: String,
    /// Destination party id.
    pub dst_party: String,
    /// Destination party role.
    pub dst_role: String,
    /// Raw route header (JSON, e.g. '{"dstPartyId":"8888"}').
    #[arg(long)]
    pub route_header: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file path.
    Path,
    /// List the installed routes.
    Routes {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
