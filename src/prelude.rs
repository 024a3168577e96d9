//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use seqlog_rs::prelude::*;
//! ```

// Engine and handles
pub use crate::sequencer::{Reader, ReaderInterrupt, Sequencer, Submission, Writer};

// Configuration
pub use crate::sequencer::{DurabilityPolicy, SequencerConfig};

// Entries
pub use crate::sequencer::{LogEntry, Message};

// Storage
pub use crate::sequencer::{FileJournal, Journal, MemoryJournal};

// Applications
pub use crate::sequencer::{AppError, AppRunner, SequencerApp};

// Errors
pub use crate::sequencer::{JournalError, SequencerError, SequencerResult};
