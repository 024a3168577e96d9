//! Sequencer subsystem: a single durable, totally ordered log shared by
//! many producers and consumers.
//!
//! Producers hand unsequenced entries to a [`Writer`]. One ingestion
//! thread inside the [`Sequencer`] stamps each entry with the next
//! sequence number and a monotonically increasing time, appends it to the
//! [`Journal`] as one text line, and only then publishes it to the
//! in-memory cache that every [`Reader`] walks.
//!
//! # Types
//!
//! - [`Sequencer`]: owns the journal, the cache and the ingestion thread
//! - [`Writer`]: per-producer handle with a source id and recovery gate
//! - [`Reader`]: per-consumer cursor with blocking, timed and async waits
//! - [`LogEntry`]: one record of the log
//! - [`Message`]: typed view over the entry kinds this crate knows
//! - [`Journal`]: append-only line store, with [`FileJournal`] and
//!   [`MemoryJournal`] implementations
//! - [`AppRunner`]: drives [`SequencerApp`]s through recovery and tailing
//! - [`codec`]: the one-line text form of a [`LogEntry`]
//!
//! # Example
//!
//! ```
//! use seqlog_rs::sequencer::{LogEntry, MemoryJournal, Sequencer, SequencerConfig};
//!
//! let config = SequencerConfig::new("memory").with_heartbeat_interval(None);
//! let mut sequencer = Sequencer::with_journal(config, Box::new(MemoryJournal::new()))?;
//! sequencer.start();
//!
//! let writer = sequencer.writer();
//! writer.mark_recovery_complete();
//! let _ = writer.submit(LogEntry::domain("desk-1", "buy 100"))?;
//!
//! let mut reader = sequencer.reader();
//! let entry = reader.next_sequenced()?;
//! assert_eq!(entry.sequence_number(), 1);
//! assert_eq!(entry.source_id(), writer.source_id());
//!
//! sequencer.stop()?;
//! # Ok::<(), seqlog_rs::sequencer::SequencerError>(())
//! ```

pub mod app;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_journal;
pub mod journal;
pub mod message;
pub mod metrics;
pub mod reader;
pub mod types;
pub mod writer;

pub use app::{AppError, AppRunner, SequencerApp};
pub use config::{DEFAULT_JOURNAL_PATH, DurabilityPolicy, SequencerConfig};
pub use engine::Sequencer;
pub use error::{JournalError, SequencerError, SequencerResult};
pub use file_journal::FileJournal;
pub use journal::{Journal, JournalLines, MemoryJournal};
pub use message::Message;
pub use reader::{Reader, ReaderInterrupt};
pub use types::{DOMAIN_MESSAGE_TYPE, HEARTBEAT_MESSAGE_TYPE, LogEntry, SEQUENCER_SOURCE};
pub use writer::{Submission, Writer};
