//! Shared constants for Ringleader components.

/// Wire value of `to` meaning "every node"
pub const BROADCAST_SENTINEL: i64 = -1;

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default pub/sub channel shared by the whole group
pub const DEFAULT_TOPIC: &str = "ringleader";

/// Default HTTP status listen address (only used when the status surface is enabled)
pub const DEFAULT_STATUS_ADDR: &str = "127.0.0.1:8787";

/// How long an election attempt waits for an `ImHigher` reply (3 seconds)
pub const ELECTION_TIMEOUT_MS: u64 = 3_000;

/// Shortest time a token holder stays in the critical section
pub const RESOURCE_MIN_HOLD_MS: u64 = 2_000;

/// Longest time a token holder stays in the critical section
pub const RESOURCE_MAX_HOLD_MS: u64 = 5_000;

/// Startup jitter before the bootstrap harness acts
pub const START_DELAY_MIN_MS: u64 = 3_000;
pub const START_DELAY_MAX_MS: u64 = 8_000;

/// Delay before the seeding node injects the first token (10 seconds)
pub const SEED_TOKEN_AFTER_MS: u64 = 10_000;

/// Bus reconnect backoff bounds
pub const BUS_INITIAL_BACKOFF_MS: u64 = 100;
pub const BUS_MAX_BACKOFF_MS: u64 = 5_000;

/// Buffered inbound payloads per subscriber
pub const INBOUND_QUEUE_CAPACITY: usize = 1_024;

/// Buffered harness commands per node
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Clock log entries kept per node; older entries are evicted first
pub const CLOCK_LOG_CAPACITY: usize = 4_096;
