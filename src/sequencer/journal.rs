//! Append-only line journal trait for durable sequencing.
//!
//! The [`Journal`] trait is the durable-store seam of the sequencer. An
//! entry is considered committed only after [`append_line`](Journal::append_line)
//! returns `Ok(())`; the ingestion loop publishes an entry to readers only
//! after that point.
//!
//! See [`FileJournal`](super::FileJournal) for the default file
//! implementation and [`MemoryJournal`] for a volatile one.

use super::error::JournalError;

/// Iterator over stored lines returned by [`Journal::read_lines`].
///
/// Lines are yielded in append order, without their trailing newline.
pub type JournalLines<'a> = Box<dyn Iterator<Item = Result<String, JournalError>> + 'a>;

/// An append-only store of text lines.
///
/// # Thread Safety
///
/// The trait only requires `Send`: a journal is moved into the ingestion
/// thread, which is its single writer. Replay happens before that thread
/// starts.
pub trait Journal: Send {
    /// Append one line. The line must not contain a newline.
    ///
    /// Implementations must leave no partial line behind when they fail.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the line could not be stored.
    fn append_line(&mut self, line: &str) -> Result<(), JournalError>;

    /// Read every committed line from the beginning.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if the store cannot be opened for reading;
    /// per-line failures are yielded by the iterator.
    fn read_lines(&self) -> Result<JournalLines<'_>, JournalError>;

    /// Flush buffered writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] if flushing fails.
    fn flush(&mut self) -> Result<(), JournalError>;

    /// Number of committed bytes.
    #[must_use]
    fn len(&self) -> u64;

    /// Whether nothing has been committed yet.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A volatile journal holding lines in memory.
///
/// Useful for tests and benchmarks that do not need persistence.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    lines: Vec<String>,
    len: u64,
}

impl MemoryJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal pre-loaded with lines, as if recovered from disk.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut journal = Self::new();
        for line in lines {
            let line = line.into();
            journal.len = journal.len.saturating_add(line.len() as u64 + 1);
            journal.lines.push(line);
        }
        journal
    }

    /// Stored lines in append order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Journal for MemoryJournal {
    fn append_line(&mut self, line: &str) -> Result<(), JournalError> {
        self.len = self.len.saturating_add(line.len() as u64 + 1);
        self.lines.push(line.to_string());
        Ok(())
    }

    fn read_lines(&self) -> Result<JournalLines<'_>, JournalError> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        Ok(())
    }

    fn len(&self) -> u64 {
        self.len
    }
}
