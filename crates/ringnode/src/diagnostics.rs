//! Per-node clock log.
//!
//! Keeps an ordered list of `(logical clock, description)` pairs for every
//! node that has logged something. A node's log is created on its first
//! entry and lives as long as the `Diagnostics` handle. Each log holds at
//! most `CLOCK_LOG_CAPACITY` entries; the oldest are evicted first.
//!
//! Rendering follows the console format used by the group's operators:
//! one `"{clock}.\t{text}"` line per entry, with empty `"{n}.\t"` lines for
//! clock values that produced no entry.

use chrono::{DateTime, Utc};
use ringleader_common::NodeId;
use ringleader_common::constants::CLOCK_LOG_CAPACITY;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One logged event
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub clock: u64,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded, ordered log of a single node
#[derive(Debug, Clone)]
pub struct ClockLog {
    capacity: usize,
    /// Clock of the newest entry ever pushed
    last_clock: u64,
    /// Clock of the newest evicted entry; rendering resumes after it
    evicted_clock: u64,
    entries: VecDeque<LogEntry>,
}

impl ClockLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            last_clock: 0,
            evicted_clock: 0,
            entries: VecDeque::new(),
        }
    }

    /// Append an entry and return the console lines it produces
    pub fn push(&mut self, clock: u64, description: &str) -> Vec<String> {
        let lines = render_step(self.last_clock, clock, description);
        self.last_clock = clock;

        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.entries.pop_front() {
                self.evicted_clock = oldest.clock;
            }
        }
        self.entries.push_back(LogEntry {
            clock,
            description: description.trim().to_string(),
            recorded_at: Utc::now(),
        });
        lines
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Console rendering of the retained entries
    pub fn render(&self) -> Vec<String> {
        let mut last = self.evicted_clock;
        let mut lines = Vec::new();
        for entry in &self.entries {
            lines.extend(render_step(last, entry.clock, &entry.description));
            last = entry.clock;
        }
        lines
    }
}

impl Default for ClockLog {
    fn default() -> Self {
        Self::with_capacity(CLOCK_LOG_CAPACITY)
    }
}

fn render_step(last: u64, clock: u64, description: &str) -> Vec<String> {
    let gap = clock.saturating_sub(last).saturating_sub(1);
    let mut lines: Vec<String> = (1..=gap).map(|i| format!("{}.\t", last + i)).collect();
    lines.push(format!("{}.\t{}", clock, description.trim()));
    lines
}

/// Clock logs of every node seen by this process
#[derive(Clone, Default)]
pub struct Diagnostics {
    logs: Arc<RwLock<HashMap<NodeId, ClockLog>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for `node` at logical time `clock`
    pub async fn record(&self, node: NodeId, clock: u64, description: impl AsRef<str>) {
        let description = description.as_ref();
        let lines = {
            let mut logs = self.logs.write().await;
            logs.entry(node).or_default().push(clock, description)
        };

        for line in lines {
            tracing::debug!(node = %node, "{}", line);
        }
    }

    pub async fn entries(&self, node: NodeId) -> Vec<LogEntry> {
        self.logs
            .read()
            .await
            .get(&node)
            .map(|log| log.entries().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn render(&self, node: NodeId) -> Vec<String> {
        self.logs
            .read()
            .await
            .get(&node)
            .map(ClockLog::render)
            .unwrap_or_default()
    }
}
