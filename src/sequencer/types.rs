//! Core types for the sequencing log.
//!
//! A [`LogEntry`] is built unsequenced by a producer, tagged with a source
//! identifier by its [`Writer`](super::Writer), and stamped with a sequence
//! number and time by the ingestion loop. Once stamped it is shared as an
//! `Arc<LogEntry>` and never mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source identifier reserved for entries synthesized by the engine itself.
pub const SEQUENCER_SOURCE: u32 = 0;

/// Message type of engine-generated heartbeat entries.
pub const HEARTBEAT_MESSAGE_TYPE: &str = "H";

/// Message type of domain entries carrying an `owner_tag|body` payload.
pub const DOMAIN_MESSAGE_TYPE: &str = "F";

/// A single entry of the sequencing log.
///
/// Entries compare equal when all five fields match, which is what the
/// codec round trip and replay checks rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    sequence_time: DateTime<Utc>,
    sequence_number: u64,
    source_id: u32,
    message_type: String,
    payload: String,
}

impl LogEntry {
    /// Create an unsequenced entry.
    ///
    /// The sequence number is 0 and the time is provisional until the
    /// ingestion loop stamps the entry.
    ///
    /// # Arguments
    ///
    /// * `message_type` - Discriminator selecting the entry variant.
    /// * `payload` - Opaque body interpreted only by producers and consumers.
    pub fn new(message_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            sequence_time: Utc::now(),
            sequence_number: 0,
            source_id: SEQUENCER_SOURCE,
            message_type: message_type.into(),
            payload: payload.into(),
        }
    }

    /// Rebuild an entry from all of its stored fields.
    pub fn from_parts(
        sequence_time: DateTime<Utc>,
        sequence_number: u64,
        source_id: u32,
        message_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            sequence_time,
            sequence_number,
            source_id,
            message_type: message_type.into(),
            payload: payload.into(),
        }
    }

    /// Time at which the entry was sequenced.
    #[must_use]
    pub fn sequence_time(&self) -> DateTime<Utc> {
        self.sequence_time
    }

    /// Sequence number, or 0 while the entry is unsequenced.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Identifier of the writer that produced the entry.
    #[must_use]
    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    /// Variant discriminator.
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Opaque payload.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whether the ingestion loop has assigned a sequence number.
    #[must_use]
    pub fn is_sequenced(&self) -> bool {
        self.sequence_number != 0
    }

    /// Whether this is an engine heartbeat.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.source_id == SEQUENCER_SOURCE && self.message_type == HEARTBEAT_MESSAGE_TYPE
    }

    pub(crate) fn set_source_id(&mut self, source_id: u32) {
        self.source_id = source_id;
    }

    pub(crate) fn stamp(&mut self, sequence_time: DateTime<Utc>, sequence_number: u64) {
        self.sequence_time = sequence_time;
        self.sequence_number = sequence_number;
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} src={} type={} payload={}",
            self.sequence_number, self.source_id, self.message_type, self.payload
        )
    }
}
