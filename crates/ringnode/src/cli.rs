//! Command-line arguments of the `ringnode` binary.

use clap::Parser;

/// Ringleader node - broadcast-coordinated election and token ring
#[derive(Parser, Debug)]
#[command(name = "ringnode")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/ringnode.toml")]
    pub config: String,

    /// Node id (overrides config)
    #[arg(long, env = "NODE_ID")]
    pub node_id: Option<u32>,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Pub/sub channel (overrides config)
    #[arg(long, env = "RINGLEADER_TOPIC")]
    pub topic: Option<String>,

    /// Start an election after the startup delay (overrides config)
    #[arg(long)]
    pub elect: Option<bool>,

    /// Seed the first token of the group (overrides config)
    #[arg(long)]
    pub seed_token: Option<bool>,

    /// HTTP status listen address (overrides config)
    #[arg(long, env = "STATUS_ADDR")]
    pub status_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    pub json_logs: bool,
}
