//! Producer-side submission handle.

use super::engine::Shared;
use super::error::SequencerResult;
use super::metrics;
use super::types::LogEntry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// What happened to a submitted entry.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Tagged and queued for sequencing.
    Accepted,
    /// Discarded because the writer's recovery gate is still closed.
    Suppressed,
}

/// A per-producer gate into the sequencer.
///
/// Each writer carries a source identifier unique within its
/// [`Sequencer`](super::Sequencer). Until
/// [`mark_recovery_complete`](Writer::mark_recovery_complete) is called,
/// every submission is dropped: during startup a producer rebuilds its
/// state from the recovered log, and anything it emits as a reaction to
/// that replay was already recorded the first time round.
///
/// `Writer` is `Send + Sync`; share it behind an `Arc` to submit from
/// several threads under one source id.
#[derive(Debug)]
pub struct Writer {
    shared: Arc<Shared>,
    source_id: u32,
    recovery_complete: AtomicBool,
}

impl Writer {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let source_id = shared.next_source_id();
        Self {
            shared,
            source_id,
            recovery_complete: AtomicBool::new(false),
        }
    }

    /// Source identifier stamped on every entry from this writer.
    #[must_use]
    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    /// Tag `entry` with this writer's source id and queue it.
    ///
    /// Never blocks. Before recovery completes the entry is dropped and
    /// [`Submission::Suppressed`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidField`](super::SequencerError::InvalidField)
    /// if the entry cannot be stored as one line, or
    /// [`SequencerError::Closed`](super::SequencerError::Closed) if the
    /// sequencer is gone.
    pub fn submit(&self, mut entry: LogEntry) -> SequencerResult<Submission> {
        if !self.is_recovery_complete() {
            debug!(
                source = self.source_id,
                message_type = entry.message_type(),
                "suppressing submission during recovery"
            );
            metrics::record_suppressed();
            return Ok(Submission::Suppressed);
        }

        entry.set_source_id(self.source_id);
        self.shared.submit(entry)?;
        Ok(Submission::Accepted)
    }

    /// Open the recovery gate. Idempotent and irreversible.
    pub fn mark_recovery_complete(&self) {
        if !self.recovery_complete.swap(true, Ordering::AcqRel) {
            debug!(source = self.source_id, "writer recovery complete");
        }
    }

    /// Whether the recovery gate is open.
    #[must_use]
    pub fn is_recovery_complete(&self) -> bool {
        self.recovery_complete.load(Ordering::Acquire)
    }
}
