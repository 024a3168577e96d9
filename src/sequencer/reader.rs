//! Consumer-side cursor over the sequenced log.

use super::engine::{Shared, WaitOutcome};
use super::error::{SequencerError, SequencerResult};
use super::types::LogEntry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Wakes a [`Reader`] blocked in one of its `next_sequenced*` methods.
///
/// The interrupt is consumed by the wait it ends, like a thread interrupt
/// flag. An interrupt raised while the reader is not waiting ends its next
/// wait instead, unless the next entry is already available.
#[derive(Debug, Clone)]
pub struct ReaderInterrupt {
    flag: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl ReaderInterrupt {
    /// Interrupt the reader.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Release);
        self.shared.wake_all();
    }
}

/// A private cursor over the sequenced log.
///
/// The cursor starts at 0 ("before the first entry"). Replaying history
/// is a loop over [`get_sequenced`](Reader::get_sequenced) from 1 to
/// [`sequenced_count`](Reader::sequenced_count); tailing is repeated calls
/// to [`next_sequenced`](Reader::next_sequenced).
#[derive(Debug)]
pub struct Reader {
    shared: Arc<Shared>,
    cursor: u64,
    interrupted: Arc<AtomicBool>,
}

impl Reader {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            cursor: 0,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sequence number of the last entry returned.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Handle that can interrupt this reader from another thread.
    #[must_use]
    pub fn interrupt_handle(&self) -> ReaderInterrupt {
        ReaderInterrupt {
            flag: Arc::clone(&self.interrupted),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Entry at `sequence`, moving the cursor there when found.
    ///
    /// The cursor may move backwards or skip ahead. Never blocks.
    pub fn get_sequenced(&mut self, sequence: u64) -> Option<Arc<LogEntry>> {
        let entry = self.shared.get(sequence)?;
        self.cursor = sequence;
        Some(entry)
    }

    /// Block until the entry after the cursor is available and return it.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Interrupted`], without moving the cursor,
    /// if the reader is interrupted or the sequencer stops while waiting.
    pub fn next_sequenced(&mut self) -> SequencerResult<Arc<LogEntry>> {
        let poll = self.shared.config().reader_poll_interval();
        loop {
            if let Some(entry) = self.poll_next(poll)? {
                return Ok(entry);
            }
        }
    }

    /// Like [`next_sequenced`](Reader::next_sequenced), giving up after
    /// `timeout` with `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Interrupted`] as `next_sequenced` does.
    pub fn next_sequenced_timeout(
        &mut self,
        timeout: Duration,
    ) -> SequencerResult<Option<Arc<LogEntry>>> {
        let deadline = Instant::now() + timeout;
        let poll = self.shared.config().reader_poll_interval();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Some(entry) = self.poll_next(poll.min(remaining))? {
                return Ok(Some(entry));
            }
            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }

    /// Await the entry after the cursor without blocking a thread.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Interrupted`], without moving the cursor,
    /// if the reader is interrupted or the sequencer stops while waiting.
    pub async fn next_sequenced_async(&mut self) -> SequencerResult<Arc<LogEntry>> {
        // Subscribe before checking so a publish in between is not missed.
        let mut high_water = self.shared.subscribe();
        let next = self.cursor + 1;
        loop {
            if let Some(entry) = self.shared.get(next) {
                self.cursor = next;
                return Ok(entry);
            }
            if self.take_interrupt() {
                return Err(SequencerError::Interrupted);
            }
            high_water
                .changed()
                .await
                .map_err(|_| SequencerError::Interrupted)?;
        }
    }

    /// Highest sequence number published, 0 if none.
    #[must_use]
    pub fn sequenced_count(&self) -> u64 {
        self.shared.count()
    }

    /// One bounded wait for `cursor + 1`.
    fn poll_next(&mut self, wait: Duration) -> SequencerResult<Option<Arc<LogEntry>>> {
        let next = self.cursor + 1;
        let flag = &self.interrupted;
        let shared = &self.shared;
        let outcome = shared.wait_for(next, wait, || {
            flag.load(Ordering::Acquire) || shared.is_stopped()
        });

        match outcome {
            WaitOutcome::Ready(entry) => {
                self.cursor = next;
                Ok(Some(entry))
            }
            WaitOutcome::Interrupted => {
                self.interrupted.store(false, Ordering::Release);
                Err(SequencerError::Interrupted)
            }
            WaitOutcome::TimedOut => Ok(None),
        }
    }

    /// Consume a pending interrupt, counting a stopped sequencer as one.
    fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::AcqRel) || self.shared.is_stopped()
    }
}
