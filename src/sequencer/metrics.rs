//! Optional `metrics` instrumentation.
//!
//! With the `metrics` feature disabled every function here is an empty
//! inline stub, so call sites stay unconditional.

/// Counter: entries committed to the journal and published.
pub const ENTRIES_SEQUENCED: &str = "seqlog_entries_sequenced_total";
/// Counter: heartbeats committed.
pub const HEARTBEATS: &str = "seqlog_heartbeats_total";
/// Counter: failed journal append attempts.
pub const DURABLE_WRITE_FAILURES: &str = "seqlog_durable_write_failures_total";
/// Counter: dequeued entries that were never sequenced.
pub const ENTRIES_DROPPED: &str = "seqlog_entries_dropped_total";
/// Counter: submissions discarded by a closed recovery gate.
pub const WRITER_SUPPRESSED: &str = "seqlog_writer_suppressed_total";
/// Gauge: highest sequence number published.
pub const SEQUENCED_COUNT: &str = "seqlog_sequenced_count";

#[cfg(feature = "metrics")]
mod imp {
    use super::*;

    #[inline]
    pub(crate) fn record_sequenced(sequence: u64, heartbeat: bool) {
        metrics::counter!(ENTRIES_SEQUENCED).increment(1);
        if heartbeat {
            metrics::counter!(HEARTBEATS).increment(1);
        }
        metrics::gauge!(SEQUENCED_COUNT).set(sequence as f64);
    }

    #[inline]
    pub(crate) fn record_write_failure() {
        metrics::counter!(DURABLE_WRITE_FAILURES).increment(1);
    }

    #[inline]
    pub(crate) fn record_dropped() {
        metrics::counter!(ENTRIES_DROPPED).increment(1);
    }

    #[inline]
    pub(crate) fn record_suppressed() {
        metrics::counter!(WRITER_SUPPRESSED).increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    #[inline(always)]
    pub(crate) fn record_sequenced(_sequence: u64, _heartbeat: bool) {}

    #[inline(always)]
    pub(crate) fn record_write_failure() {}

    #[inline(always)]
    pub(crate) fn record_dropped() {}

    #[inline(always)]
    pub(crate) fn record_suppressed() {}
}

pub(crate) use imp::*;
