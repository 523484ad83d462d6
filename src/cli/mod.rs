pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sockline", version, about = "Minimal TCP request/response client")]
pub struct Cli {
    /// Explicit config file; defaults to ./sockline.toml, then the platform
    /// config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one request and print the peer's response
    Send {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Request body; the end-of-message sentinel is appended on the wire
        #[arg(long, default_value = "")]
        message: String,

        /// Extra connection attempts after a failed connect
        #[arg(long)]
        retries: Option<u32>,

        /// Label echoed back in the result
        #[arg(long)]
        tag: Option<String>,

        /// Connection deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Pause between retry attempts in milliseconds
        #[arg(long)]
        backoff_ms: Option<u64>,

        /// Decode the response as UTF-8 instead of Shift_JIS
        #[arg(long)]
        utf8: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the resolved configuration and where it was loaded from
    Config,
}
