//! Command-line interface definitions.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

/// Watch a directory tree and push reload notifications to subscribers
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: livewatch.toml)
    #[arg(short = 'C', long, global = true, default_value = "livewatch.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch roots and serve the notification stream
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Subscribe to a notification stream and act on reloads
    #[command(visible_alias = "l")]
    Listen {
        #[command(flatten)]
        args: ListenArgs,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Directories or files to watch (replaces configured roots)
    #[arg(value_name = "ROOT", value_hint = clap::ValueHint::AnyPath)]
    pub roots: Vec<PathBuf>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path subscribers connect to
    #[arg(long)]
    pub mount: Option<String>,

    /// Quiet period before a reload is sent, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Heartbeat period, in milliseconds
    #[arg(long, value_name = "MS")]
    pub heartbeat_ms: Option<u64>,
}

/// Listen command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ListenArgs {
    /// Notification stream URL
    #[arg(value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// Shell command to run on every reload
    #[arg(short, long, value_name = "COMMAND")]
    pub exec: Option<String>,

    /// Delay before each reconnect attempt, in milliseconds
    #[arg(long, value_name = "MS")]
    pub reconnect_ms: Option<u64>,
}
