//! Configuration management for ringnode.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use ringleader_common::NodeId;
use ringleader_common::constants::{
    DEFAULT_REDIS_URL, DEFAULT_TOPIC, ELECTION_TIMEOUT_MS, RESOURCE_MAX_HOLD_MS,
    RESOURCE_MIN_HOLD_MS, SEED_TOKEN_AFTER_MS, START_DELAY_MAX_MS, START_DELAY_MIN_MS,
};

use crate::cli::Args;
use crate::node::NodeTimings;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// This node's id, unique within the group
    #[serde(default)]
    pub node_id: u32,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Pub/sub channel shared by the group
    #[serde(default = "default_topic")]
    pub topic: String,

    /// HTTP status listen address (disabled when unset)
    #[serde(default)]
    pub status_addr: Option<String>,

    /// Election configuration
    #[serde(default)]
    pub election: ElectionConfig,

    /// Critical-section configuration
    #[serde(default)]
    pub resource: ResourceConfig,

    /// Startup behaviour
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Election-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ElectionConfig {
    /// How long to wait for an `ImHigher` before claiming leadership.
    /// Must cover a full round trip on the bus.
    #[serde(default = "default_election_timeout")]
    pub timeout_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_election_timeout(),
        }
    }
}

/// Critical-section configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Shortest stay while holding the token
    #[serde(default = "default_min_hold")]
    pub min_hold_ms: u64,

    /// Longest stay while holding the token
    #[serde(default = "default_max_hold")]
    pub max_hold_ms: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            min_hold_ms: default_min_hold(),
            max_hold_ms: default_max_hold(),
        }
    }
}

/// Bootstrap harness configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Random startup delay lower bound
    #[serde(default = "default_start_delay_min")]
    pub start_delay_min_ms: u64,

    /// Random startup delay upper bound
    #[serde(default = "default_start_delay_max")]
    pub start_delay_max_ms: u64,

    /// Start an election after the startup delay (default: node 0 only)
    #[serde(default)]
    pub elect: Option<bool>,

    /// Seed the group's first token (default: node 1 only).
    /// Exactly one node of the group must do this.
    #[serde(default)]
    pub seed_token: Option<bool>,

    /// Delay between the startup delay and seeding the token
    #[serde(default = "default_seed_after")]
    pub seed_token_after_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            start_delay_min_ms: default_start_delay_min(),
            start_delay_max_ms: default_start_delay_max(),
            elect: None,
            seed_token: None,
            seed_token_after_ms: default_seed_after(),
        }
    }
}

/// Concrete startup actions for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub start_delay: Duration,
    pub elect: bool,
    pub seed_token_after: Option<Duration>,
}

impl BootstrapConfig {
    /// Resolve defaults for `node_id` and draw the startup delay
    pub fn plan(&self, node_id: NodeId, rng: &mut impl rand::Rng) -> BootstrapPlan {
        let low = self.start_delay_min_ms.min(self.start_delay_max_ms);
        let high = self.start_delay_max_ms.max(self.start_delay_min_ms);
        let seed = self.seed_token.unwrap_or(node_id.value() == 1);

        BootstrapPlan {
            start_delay: Duration::from_millis(rng.random_range(low..=high)),
            elect: self.elect.unwrap_or(node_id.value() == 0),
            seed_token_after: seed.then(|| Duration::from_millis(self.seed_token_after_ms)),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_topic() -> String { DEFAULT_TOPIC.to_string() }
fn default_election_timeout() -> u64 { ELECTION_TIMEOUT_MS }
fn default_min_hold() -> u64 { RESOURCE_MIN_HOLD_MS }
fn default_max_hold() -> u64 { RESOURCE_MAX_HOLD_MS }
fn default_start_delay_min() -> u64 { START_DELAY_MIN_MS }
fn default_start_delay_max() -> u64 { START_DELAY_MAX_MS }
fn default_seed_after() -> u64 { SEED_TOKEN_AFTER_MS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(node_id) = args.node_id {
            config.node_id = node_id;
        }
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref topic) = args.topic {
            config.topic = topic.clone();
        }
        if let Some(ref status_addr) = args.status_addr {
            config.status_addr = Some(status_addr.clone());
        }
        if args.elect.is_some() {
            config.bootstrap.elect = args.elect;
        }
        if args.seed_token.is_some() {
            config.bootstrap.seed_token = args.seed_token;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            bail!("topic must not be empty");
        }
        if self.election.timeout_ms == 0 {
            bail!("election.timeout_ms must be positive");
        }
        if self.resource.min_hold_ms > self.resource.max_hold_ms {
            bail!(
                "resource.min_hold_ms ({}) exceeds resource.max_hold_ms ({})",
                self.resource.min_hold_ms,
                self.resource.max_hold_ms
            );
        }
        Ok(())
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.node_id)
    }

    pub fn node_timings(&self) -> NodeTimings {
        NodeTimings {
            election_timeout: Duration::from_millis(self.election.timeout_ms),
            min_hold: Duration::from_millis(self.resource.min_hold_ms),
            max_hold: Duration::from_millis(self.resource.max_hold_ms),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            redis_url: default_redis_url(),
            topic: default_topic(),
            status_addr: None,
            election: ElectionConfig::default(),
            resource: ResourceConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}
