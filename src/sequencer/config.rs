//! Sequencer configuration.
//!
//! [`SequencerConfig`] can be built in code with the `with_*` setters or
//! loaded from JSON. Durations are stored as milliseconds so the JSON form
//! stays flat:
//!
//! ```json
//! {
//!   "path": "data/sequencer/file.txt",
//!   "heartbeat_interval_ms": 1000,
//!   "poll_interval_ms": 100,
//!   "durability": { "retry": { "max_attempts": 3, "backoff_ms": 10 } }
//! }
//! ```

use super::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the journal file.
pub const DEFAULT_JOURNAL_PATH: &str = "target/data/sequencer/file.txt";

const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_STOP_TIMEOUT_MS: u64 = 1_000;

/// What the ingestion loop does when a journal append fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityPolicy {
    /// Retry with exponential backoff, then drop the entry.
    ///
    /// A dropped entry never receives a sequence number, so the log stays
    /// gap-free; delivery for that entry is at-most-once.
    Retry {
        /// Total number of append attempts, including the first.
        max_attempts: u32,
        /// Delay before the first retry; doubled after every failure.
        backoff_ms: u64,
    },

    /// Stop the ingestion loop on the first failure.
    Halt,
}

impl Default for DurabilityPolicy {
    fn default() -> Self {
        DurabilityPolicy::Retry {
            max_attempts: 3,
            backoff_ms: 10,
        }
    }
}

/// Runtime settings for a [`Sequencer`](super::Sequencer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Journal file, created together with its parent directories.
    pub path: PathBuf,
    /// Heartbeat period; `None` disables heartbeats.
    pub heartbeat_interval_ms: Option<u64>,
    /// Bounded wait of the ingestion loop for new entries.
    pub poll_interval_ms: u64,
    /// Bounded wait of a blocked reader between availability checks.
    pub reader_poll_interval_ms: u64,
    /// How long `stop()` waits for the ingestion thread.
    pub stop_timeout_ms: u64,
    /// Call `sync_data` after every append.
    pub sync_on_append: bool,
    /// Journal append failure handling.
    pub durability: DurabilityPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_JOURNAL_PATH),
            heartbeat_interval_ms: Some(DEFAULT_HEARTBEAT_INTERVAL_MS),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reader_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            sync_on_append: false,
            durability: DurabilityPolicy::default(),
        }
    }
}

impl SequencerConfig {
    /// Default configuration writing to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the heartbeat interval, or disable heartbeats with `None`.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat_interval_ms = interval.map(duration_to_ms);
        self
    }

    /// Set the ingestion loop's bounded wait.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_to_ms(interval);
        self
    }

    /// Set a blocked reader's bounded wait.
    #[must_use]
    pub fn with_reader_poll_interval(mut self, interval: Duration) -> Self {
        self.reader_poll_interval_ms = duration_to_ms(interval);
        self
    }

    /// Set how long `stop()` waits for the ingestion thread.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// Enable or disable `sync_data` after each append.
    #[must_use]
    pub fn with_sync_on_append(mut self, sync: bool) -> Self {
        self.sync_on_append = sync;
        self
    }

    /// Set the journal failure policy.
    #[must_use]
    pub fn with_durability(mut self, durability: DurabilityPolicy) -> Self {
        self.durability = durability;
        self
    }

    /// Parse a configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] on malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> SequencerResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SequencerError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SequencerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SequencerError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] describing the first bad value.
    pub fn validate(&self) -> SequencerResult<()> {
        if self.poll_interval_ms == 0 || self.reader_poll_interval_ms == 0 {
            return Err(SequencerError::Config {
                message: "poll intervals must be at least 1ms".to_string(),
            });
        }
        if self.heartbeat_interval_ms == Some(0) {
            return Err(SequencerError::Config {
                message: "heartbeat interval must be at least 1ms; use null to disable"
                    .to_string(),
            });
        }
        if let DurabilityPolicy::Retry { max_attempts: 0, .. } = self.durability {
            return Err(SequencerError::Config {
                message: "retry policy needs at least one attempt".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_ms.map(Duration::from_millis)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn reader_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reader_poll_interval_ms)
    }

    pub(crate) fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
