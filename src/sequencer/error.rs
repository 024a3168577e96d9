//! Error types for the sequencing log.
//!
//! [`JournalError`] covers failure modes of the durable line journal.
//! [`SequencerError`] is the crate-level error returned by the engine,
//! its writer and reader handles, and the codec.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur within the journal subsystem.
#[derive(Debug)]
#[non_exhaustive]
pub enum JournalError {
    /// An I/O error occurred while reading or writing the journal file.
    Io {
        /// The underlying I/O error message.
        message: String,
        /// The file path involved, if known.
        path: Option<PathBuf>,
    },

    /// A stored line is not valid UTF-8.
    InvalidUtf8 {
        /// Byte offset of the start of the offending line.
        offset: u64,
    },

    /// A stored line has no terminating newline within the committed range.
    TornLine {
        /// Byte offset of the start of the offending line.
        offset: u64,
    },
}

impl JournalError {
    /// Build an [`JournalError::Io`] tagged with the file it concerns.
    #[cold]
    pub(crate) fn io_at(err: std::io::Error, path: &std::path::Path) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: Some(path.to_path_buf()),
        }
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "journal I/O error at {}: {message}", p.display())
                } else {
                    write!(f, "journal I/O error: {message}")
                }
            }
            JournalError::InvalidUtf8 { offset } => {
                write!(f, "journal line at offset {offset} is not valid UTF-8")
            }
            JournalError::TornLine { offset } => {
                write!(f, "journal line at offset {offset} is not newline-terminated")
            }
        }
    }
}

impl std::error::Error for JournalError {}

impl From<std::io::Error> for JournalError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

/// Errors surfaced by the sequencer engine and its handles.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SequencerError {
    /// A stored or supplied line could not be decoded into a log entry.
    #[error("malformed log entry ({reason}): {line:?}")]
    MalformedEntry {
        /// The offending line, without its trailing newline.
        line: String,
        /// What failed to parse.
        reason: String,
    },

    /// Replay found an entry whose sequence number does not follow the
    /// previous one.
    #[error("sequence gap during replay: expected {expected}, found {found}")]
    SequenceGap {
        /// The sequence number replay expected next.
        expected: u64,
        /// The sequence number actually read.
        found: u64,
    },

    /// An entry field cannot be represented in the line format.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the rejected field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The durable journal failed.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The ingestion thread did not exit within the stop timeout.
    #[error("ingestion loop did not stop within {timeout:?}")]
    StopTimeout {
        /// The bounded wait that elapsed.
        timeout: Duration,
    },

    /// A blocked reader was interrupted before its next entry arrived.
    #[error("reader interrupted while waiting for the next entry")]
    Interrupted,

    /// The sequencer owning the queue has been dropped.
    #[error("sequencer closed")]
    Closed,

    /// Configuration could not be loaded.
    #[error("invalid sequencer configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl SequencerError {
    #[cold]
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        SequencerError::MalformedEntry {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type SequencerResult<T> = Result<T, SequencerError>;
