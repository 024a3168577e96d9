//! The sequencing engine.
//!
//! A [`Sequencer`] owns the journal, the in-memory cache of sequenced
//! entries, and a single ingestion thread. Producers push entries onto an
//! unbounded channel through [`Writer`] handles; the ingestion thread is the
//! only code that assigns sequence numbers, appends to the journal, and
//! appends to the cache. Readers only ever read the cache by index.
//!
//! # Commit Order
//!
//! For every entry the ingestion thread performs, in order:
//!
//! 1. stamp `sequence = last + 1` and a strictly increasing time;
//! 2. append the encoded line to the journal;
//! 3. push into the cache, then wake blocked and async readers.
//!
//! An entry that fails step 2 is never published and never consumes a
//! sequence number, so the cache and the journal always agree.

use super::codec;
use super::config::{DurabilityPolicy, SequencerConfig};
use super::error::{SequencerError, SequencerResult};
use super::file_journal::FileJournal;
use super::journal::Journal;
use super::metrics;
use super::reader::Reader;
use super::types::{LogEntry, SEQUENCER_SOURCE};
use super::writer::Writer;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Outcome of a bounded wait for a sequence number.
pub(crate) enum WaitOutcome {
    Ready(Arc<LogEntry>),
    Interrupted,
    TimedOut,
}

/// State shared between the engine, its ingestion thread, and all handles.
pub(crate) struct Shared {
    config: SequencerConfig,
    /// `cache[n - 1]` holds sequence `n`.
    cache: Mutex<Vec<Arc<LogEntry>>>,
    /// Signalled after every publish, stop, and reader interrupt.
    appended: Condvar,
    /// Mirror of the cache length readable without the lock.
    count: AtomicU64,
    /// High-water mark for async readers.
    high_water: watch::Sender<u64>,
    queue: Sender<LogEntry>,
    running: AtomicBool,
    /// Set by `stop()` or a halted loop; cleared by `start()`.
    stopped: AtomicBool,
    next_source: AtomicU32,
}

impl Shared {
    fn lock_cache(&self) -> MutexGuard<'_, Vec<Arc<LogEntry>>> {
        // The cache is only ever pushed to; a panicking holder cannot leave
        // it half-updated.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub(crate) fn submit(&self, entry: LogEntry) -> SequencerResult<()> {
        codec::validate(&entry)?;
        self.queue.send(entry).map_err(|_| SequencerError::Closed)
    }

    pub(crate) fn get(&self, sequence: u64) -> Option<Arc<LogEntry>> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.lock_cache().get(index).cloned()
    }

    pub(crate) fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub(crate) fn next_source_id(&self) -> u32 {
        self.next_source.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.high_water.subscribe()
    }

    /// Wait up to `timeout` for `sequence` to be published.
    ///
    /// `interrupted` is evaluated while holding the cache lock, so an
    /// interrupter that sets its flag and then calls [`Shared::wake_all`]
    /// cannot be missed.
    pub(crate) fn wait_for(
        &self,
        sequence: u64,
        timeout: Duration,
        interrupted: impl Fn() -> bool,
    ) -> WaitOutcome {
        let Some(index) = sequence
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
        else {
            return WaitOutcome::TimedOut;
        };

        let cache = self.lock_cache();
        if let Some(entry) = cache.get(index) {
            return WaitOutcome::Ready(Arc::clone(entry));
        }
        if interrupted() {
            return WaitOutcome::Interrupted;
        }

        let (cache, _) = self
            .appended
            .wait_timeout(cache, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        match cache.get(index) {
            Some(entry) => WaitOutcome::Ready(Arc::clone(entry)),
            None if interrupted() => WaitOutcome::Interrupted,
            None => WaitOutcome::TimedOut,
        }
    }

    /// Wake every blocked and async reader.
    pub(crate) fn wake_all(&self) {
        drop(self.lock_cache());
        self.appended.notify_all();
        self.high_water.send_modify(|_| {});
    }

    fn publish(&self, entry: Arc<LogEntry>) -> u64 {
        let len = {
            let mut cache = self.lock_cache();
            cache.push(entry);
            let len = cache.len() as u64;
            self.count.store(len, Ordering::Release);
            len
        };
        self.appended.notify_all();
        self.high_water.send_replace(len);
        len
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("path", &self.config.path)
            .field("count", &self.count())
            .field("running", &self.running.load(Ordering::Acquire))
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// What the ingestion thread hands back when it exits.
struct LoopState {
    journal: Box<dyn Journal>,
    last_time: Option<DateTime<Utc>>,
}

/// A running ingestion thread.
struct Ingestion {
    handle: JoinHandle<()>,
    wake: Sender<()>,
    done: Receiver<LoopState>,
}

/// A durable, gap-free sequencing log.
///
/// # Lifecycle
///
/// [`open`](Sequencer::open) replays the journal into the cache and fails
/// if any stored line is corrupt or out of sequence. Readers may walk the
/// recovered history immediately. [`start`](Sequencer::start) launches the
/// ingestion thread; [`stop`](Sequencer::stop) ends it with a bounded wait.
///
/// # Example
///
/// ```rust,no_run
/// use seqlog_rs::sequencer::{LogEntry, Sequencer, SequencerConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut sequencer = Sequencer::open(SequencerConfig::new("/tmp/seq/file.txt"))?;
/// sequencer.start();
///
/// let writer = sequencer.writer();
/// writer.mark_recovery_complete();
/// let _ = writer.submit(LogEntry::domain("session-1", "35=D"))?;
///
/// let mut reader = sequencer.reader();
/// let first = reader.next_sequenced()?;
/// println!("{first}");
/// sequencer.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct Sequencer {
    shared: Arc<Shared>,
    queue: Receiver<LogEntry>,
    /// Present while the ingestion thread is not running.
    journal: Option<Box<dyn Journal>>,
    last_time: Option<DateTime<Utc>>,
    ingestion: Option<Ingestion>,
}

impl Sequencer {
    /// Open the file journal named by `config` and replay it.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Config`] for invalid settings,
    /// [`SequencerError::Journal`] if the file cannot be opened or read,
    /// and [`SequencerError::MalformedEntry`] or
    /// [`SequencerError::SequenceGap`] if the stored history is corrupt.
    pub fn open(config: SequencerConfig) -> SequencerResult<Self> {
        config.validate()?;
        let journal = FileJournal::open(&config.path)?.with_sync_on_append(config.sync_on_append);
        Self::with_journal(config, Box::new(journal))
    }

    /// Build a sequencer over any journal implementation and replay it.
    ///
    /// # Errors
    ///
    /// Same as [`Sequencer::open`], minus file creation.
    pub fn with_journal(
        config: SequencerConfig,
        journal: Box<dyn Journal>,
    ) -> SequencerResult<Self> {
        config.validate()?;

        let cache = replay(journal.as_ref())?;
        let count = cache.len() as u64;
        let last_time = cache.last().map(|e| e.sequence_time());
        info!(
            path = %config.path.display(),
            recovered = count,
            bytes = journal.len(),
            "sequencer journal replayed"
        );

        let (queue_tx, queue_rx) = channel::unbounded();
        let (high_water, _) = watch::channel(count);

        let shared = Arc::new(Shared {
            config,
            cache: Mutex::new(cache),
            appended: Condvar::new(),
            count: AtomicU64::new(count),
            high_water,
            queue: queue_tx,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            next_source: AtomicU32::new(SEQUENCER_SOURCE + 1),
        });

        Ok(Self {
            shared,
            queue: queue_rx,
            journal: Some(journal),
            last_time,
            ingestion: None,
        })
    }

    /// Launch the ingestion thread.
    ///
    /// Returns `false` if it is already running, or if a previous thread
    /// failed to stop and still owns the journal.
    pub fn start(&mut self) -> bool {
        if self.ingestion.is_some() {
            return false;
        }
        let Some(journal) = self.journal.take() else {
            warn!("cannot start sequencer: journal still owned by a stuck ingestion thread");
            return false;
        };

        let (wake_tx, wake_rx) = channel::bounded(1);
        let (done_tx, done_rx) = channel::bounded(1);

        self.shared.stopped.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let ingest = IngestLoop {
            shared: Arc::clone(&self.shared),
            journal,
            queue: self.queue.clone(),
            wake: wake_rx,
            next: self.shared.count(),
            last_time: self.last_time,
            last_heartbeat: None,
        };

        let spawned = thread::Builder::new()
            .name("seqlog-ingest".to_string())
            .spawn(move || {
                let state = ingest.run();
                let _ = done_tx.send(state);
            });

        match spawned {
            Ok(handle) => {
                info!(next = self.shared.count() + 1, "sequencer started");
                self.ingestion = Some(Ingestion {
                    handle,
                    wake: wake_tx,
                    done: done_rx,
                });
                true
            }
            Err(e) => {
                // The closure, and the journal with it, is gone.
                error!(error = %e, "failed to spawn ingestion thread");
                self.shared.running.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Stop the ingestion thread, waiting at most the configured timeout.
    ///
    /// Blocked readers are woken and return
    /// [`SequencerError::Interrupted`]. Entries still queued stay queued
    /// and are sequenced after the next [`start`](Sequencer::start).
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::StopTimeout`] if the thread does not exit
    /// in time. The journal and cache stay consistent up to the last
    /// completed cycle; the thread is detached.
    pub fn stop(&mut self) -> SequencerResult<()> {
        self.shared.running.store(false, Ordering::Release);
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.wake_all();

        let Some(ingestion) = self.ingestion.take() else {
            return Ok(());
        };
        let _ = ingestion.wake.try_send(());

        let timeout = self.shared.config.stop_timeout();
        match ingestion.done.recv_timeout(timeout) {
            Ok(state) => {
                if ingestion.handle.join().is_err() {
                    warn!("ingestion thread panicked after handing back its state");
                }
                self.journal = Some(state.journal);
                self.last_time = state.last_time;
                if let Some(journal) = self.journal.as_mut()
                    && let Err(e) = journal.flush()
                {
                    warn!(error = %e, "journal flush on stop failed");
                }
                info!(sequenced = self.shared.count(), "sequencer stopped");
                Ok(())
            }
            Err(_) => {
                warn!(?timeout, "unable to stop ingestion thread cleanly");
                Err(SequencerError::StopTimeout { timeout })
            }
        }
    }

    /// Whether the ingestion thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Enqueue an unsequenced entry. Never blocks.
    ///
    /// Producers normally go through a [`Writer`], which also applies the
    /// recovery gate and source tagging.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidField`] if the entry cannot be
    /// encoded as one journal line.
    pub fn submit_unsequenced(&self, entry: LogEntry) -> SequencerResult<()> {
        self.shared.submit(entry)
    }

    /// Entry at `sequence`, or `None` if it has not been sequenced yet.
    #[must_use]
    pub fn get_sequenced(&self, sequence: u64) -> Option<Arc<LogEntry>> {
        self.shared.get(sequence)
    }

    /// Highest sequence number published, 0 if none.
    #[must_use]
    pub fn sequenced_count(&self) -> u64 {
        self.shared.count()
    }

    /// Create a writer with the next source identifier.
    #[must_use]
    pub fn writer(&self) -> Writer {
        Writer::new(Arc::clone(&self.shared))
    }

    /// Create a reader positioned before the first entry.
    #[must_use]
    pub fn reader(&self) -> Reader {
        Reader::new(Arc::clone(&self.shared))
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SequencerConfig {
        self.shared.config()
    }

    /// Journal location named by the configuration.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.config.path
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        if self.ingestion.is_some()
            && let Err(e) = self.stop()
        {
            warn!(error = %e, "sequencer dropped without a clean stop");
        }
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("path", &self.shared.config.path)
            .field("sequenced", &self.shared.count())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Rebuild the cache from the journal. Any bad line aborts recovery.
fn replay(journal: &dyn Journal) -> SequencerResult<Vec<Arc<LogEntry>>> {
    let mut cache: Vec<Arc<LogEntry>> = Vec::new();
    for line in journal.read_lines()? {
        let entry = codec::decode(&line?)?;
        let expected = cache.len() as u64 + 1;
        if entry.sequence_number() != expected {
            return Err(SequencerError::SequenceGap {
                expected,
                found: entry.sequence_number(),
            });
        }
        cache.push(Arc::new(entry));
    }
    Ok(cache)
}

// ─── Ingestion ──────────────────────────────────────────────────────────────

struct IngestLoop {
    shared: Arc<Shared>,
    journal: Box<dyn Journal>,
    queue: Receiver<LogEntry>,
    wake: Receiver<()>,
    /// Last sequence number committed.
    next: u64,
    last_time: Option<DateTime<Utc>>,
    last_heartbeat: Option<Instant>,
}

impl IngestLoop {
    fn run(mut self) -> LoopState {
        debug!("ingestion loop running");
        while self.shared.running.load(Ordering::Acquire) {
            if self.heartbeat_due() {
                self.last_heartbeat = Some(Instant::now());
                if self.sequence(LogEntry::heartbeat()).is_break() {
                    self.halt();
                    break;
                }
            }

            let wait = self.idle_wait();
            let received = crossbeam::select! {
                recv(self.queue) -> entry => Some(entry),
                recv(self.wake) -> _ => None,
                default(wait) => None,
            };
            let flow = match received {
                Some(Ok(entry)) => self.sequence(entry),
                Some(Err(_)) => ControlFlow::Break(()),
                None => ControlFlow::Continue(()),
            };
            if flow.is_break() {
                self.halt();
                break;
            }
        }
        debug!(last = self.next, "ingestion loop exited");

        LoopState {
            journal: self.journal,
            last_time: self.last_time,
        }
    }

    fn heartbeat_due(&self) -> bool {
        match (self.shared.config.heartbeat_interval(), self.last_heartbeat) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => last.elapsed() > interval,
        }
    }

    /// Poll interval, shortened so the next heartbeat is not late.
    fn idle_wait(&self) -> Duration {
        let poll = self.shared.config.poll_interval();
        match (self.shared.config.heartbeat_interval(), self.last_heartbeat) {
            (Some(interval), Some(last)) => {
                let until_due = interval.saturating_sub(last.elapsed()) + Duration::from_millis(1);
                poll.min(until_due)
            }
            _ => poll,
        }
    }

    fn halt(&self) {
        error!(last = self.next, "ingestion loop halted");
        self.shared.running.store(false, Ordering::Release);
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.wake_all();
    }

    /// Next sequence time, strictly after the previous one.
    fn next_time(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_time {
            Some(last) if now <= last => last + chrono::Duration::nanoseconds(1),
            _ => now,
        }
    }

    /// Stamp, persist, and publish one entry.
    ///
    /// Breaks only when the durability policy demands a halt.
    fn sequence(&mut self, mut entry: LogEntry) -> ControlFlow<()> {
        let sequence = self.next + 1;
        let time = self.next_time();
        entry.stamp(time, sequence);

        let line = match codec::encode(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, source = entry.source_id(), "dropping unencodable entry");
                metrics::record_dropped();
                return ControlFlow::Continue(());
            }
        };

        if let Err(e) = self.persist(&line) {
            return match self.shared.config.durability {
                DurabilityPolicy::Halt => {
                    error!(sequence, error = %e, "journal append failed, halting");
                    metrics::record_dropped();
                    ControlFlow::Break(())
                }
                DurabilityPolicy::Retry { max_attempts, .. } => {
                    error!(
                        sequence,
                        attempts = max_attempts,
                        error = %e,
                        source = entry.source_id(),
                        "journal append failed, dropping entry"
                    );
                    metrics::record_dropped();
                    ControlFlow::Continue(())
                }
            };
        }

        trace!(%entry, "sequenced");
        let heartbeat = entry.is_heartbeat();
        self.next = sequence;
        self.last_time = Some(time);
        self.shared.publish(Arc::new(entry));
        metrics::record_sequenced(sequence, heartbeat);
        ControlFlow::Continue(())
    }

    fn persist(&mut self, line: &str) -> SequencerResult<()> {
        let (attempts, mut backoff) = match self.shared.config.durability {
            DurabilityPolicy::Retry {
                max_attempts,
                backoff_ms,
            } => (max_attempts.max(1), Duration::from_millis(backoff_ms)),
            DurabilityPolicy::Halt => (1, Duration::ZERO),
        };

        let mut attempt = 1;
        loop {
            match self.journal.append_line(line) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    metrics::record_write_failure();
                    if attempt >= attempts || !self.shared.running.load(Ordering::Acquire) {
                        return Err(e.into());
                    }
                    warn!(attempt, error = %e, ?backoff, "journal append failed, retrying");
                    thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}
