//! # Durable Sequencing Log
//!
//! A single, durable, totally ordered log that many independent producers
//! write into and many independent consumers read from. Every accepted
//! entry receives a unique, gap-free, monotonically increasing sequence
//! number and a sequence timestamp, is appended to a text journal, and is
//! then made visible to every reader in exactly that order.
//!
//! On restart the journal is replayed to rebuild the in-memory state, so
//! consumers can deterministically re-process history before resuming live
//! operation.
//!
//! ## Key Features
//!
//! - **Single Writer Thread**: one ingestion thread owns sequence
//!   assignment, journal appends and cache appends. Producers never block.
//!
//! - **Persist Before Publish**: an entry is visible to readers only after
//!   its journal line has been written. A failed write never consumes a
//!   sequence number.
//!
//! - **Gap-Free Recovery**: replay rejects malformed lines and
//!   non-contiguous sequence numbers instead of silently skipping them.
//!
//! - **Recovery Gates**: each [`Writer`] drops submissions until its owner
//!   has finished rebuilding state from the recovered log, so reactions to
//!   replayed history are not recorded twice.
//!
//! - **Heartbeats**: the sequencer emits its own liveness entries while the
//!   log is idle, keeping downstream consumers' clocks moving.
//!
//! - **Blocking, Timed and Async Readers**: a [`Reader`] can block on the
//!   next entry, wait with a timeout, or await it on a tokio runtime.
//!
//! ## Journal Format
//!
//! One entry per line, five `|`-separated fields:
//!
//! ```text
//! 2024-03-01T12:30:45.123456789Z|42|3|F|session-7|35=D;55=IBM
//! ```
//!
//! `sequence_time` (RFC 3339, UTC), `sequence_number`, `source_id`,
//! `message_type`, `payload`. Everything after the fourth delimiter is the
//! payload, which may itself contain `|`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seqlog_rs::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sequencer = Sequencer::open(SequencerConfig::default())?;
//! sequencer.start();
//!
//! let writer = sequencer.writer();
//! writer.mark_recovery_complete();
//! let _ = writer.submit(LogEntry::domain("session-7", "35=D;55=IBM"))?;
//!
//! let mut reader = sequencer.reader();
//! while let Ok(entry) = reader.next_sequenced() {
//!     tracing::info!(%entry, "sequenced");
//!     if entry.sequence_number() >= 10 {
//!         break;
//!     }
//! }
//! sequencer.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `metrics`: emit counters and gauges through the `metrics` facade
//!   (entries sequenced, heartbeats, durable write failures, dropped and
//!   suppressed entries, current sequence number).
//!
//! ## Logging
//!
//! The crate logs through `tracing` and never installs a subscriber; the
//! binaries under `demos/` show a typical `tracing-subscriber` setup.

pub mod prelude;
pub mod sequencer;

pub use sequencer::{
    AppError, AppRunner, DEFAULT_JOURNAL_PATH, DOMAIN_MESSAGE_TYPE, DurabilityPolicy,
    FileJournal, HEARTBEAT_MESSAGE_TYPE, Journal, JournalError, JournalLines, LogEntry,
    MemoryJournal, Message, Reader, ReaderInterrupt, SEQUENCER_SOURCE, Sequencer, SequencerApp,
    SequencerConfig, SequencerError, SequencerResult, Submission, Writer, codec,
};
