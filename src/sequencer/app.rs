//! Recovery-then-tail driver for applications built on the log.
//!
//! An application reacts to sequenced entries and emits new ones through
//! its [`Writer`]. At startup the [`AppRunner`] feeds it the recovered
//! history with `is_recovery = true` while every registered writer's gate
//! is still closed, so reactions to replayed entries are suppressed. It
//! then opens the gates, starts the applications, and tails the log.

use super::engine::Sequencer;
use super::error::{SequencerError, SequencerResult};
use super::reader::{Reader, ReaderInterrupt};
use super::types::LogEntry;
use super::writer::Writer;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Failure of an application to handle one sequenced entry.
///
/// The runner logs it and moves on; other applications still see the
/// entry and the shared cursor still advances.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// The entry names an owner (session, venue, ...) the application does
    /// not know.
    #[error("no destination for owner {owner_tag:?}")]
    SessionLookup {
        /// The unresolved owner tag.
        owner_tag: String,
    },

    /// The entry payload did not parse.
    #[error(transparent)]
    Entry(#[from] SequencerError),

    /// Any other application failure.
    #[error("{0}")]
    Other(String),
}

/// A consumer of the sequenced log.
pub trait SequencerApp: Send {
    /// Name used in log output.
    fn name(&self) -> &str {
        "sequencer-app"
    }

    /// Handle one sequenced entry.
    ///
    /// `is_recovery` is `true` while the runner replays history recorded
    /// before this process started.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] when the entry cannot be handled; the runner
    /// logs it and skips the entry for this application only.
    fn on_sequenced(&mut self, entry: &LogEntry, is_recovery: bool) -> Result<(), AppError>;

    /// Called once recovery is complete and the writer gates are open.
    fn start(&mut self) {}

    /// Called when the runner stops tailing.
    fn stop(&mut self) {}
}

/// Drives registered applications through recovery and then live tailing.
pub struct AppRunner {
    reader: Reader,
    recovery_target: u64,
    apps: Vec<Box<dyn SequencerApp>>,
    writers: Vec<Arc<Writer>>,
    dispatched: u64,
}

impl AppRunner {
    /// Create a runner over `sequencer`.
    ///
    /// The recovery range is fixed here as `1..=sequenced_count()`, so
    /// build the runner before producers start submitting.
    #[must_use]
    pub fn new(sequencer: &Sequencer) -> Self {
        Self {
            reader: sequencer.reader(),
            recovery_target: sequencer.sequenced_count(),
            apps: Vec::new(),
            writers: Vec::new(),
            dispatched: 0,
        }
    }

    /// Register an application together with the writer it emits through.
    pub fn register<A>(&mut self, app: A, writer: Arc<Writer>)
    where
        A: SequencerApp + 'static,
    {
        self.apps.push(Box::new(app));
        self.writers.push(writer);
    }

    /// Track a writer whose gate should open with the others, without an
    /// application attached.
    pub fn add_writer(&mut self, writer: Arc<Writer>) {
        self.writers.push(writer);
    }

    /// Last sequence number of the recovered history.
    #[must_use]
    pub fn recovery_target(&self) -> u64 {
        self.recovery_target
    }

    /// Number of entries dispatched so far, recovery included.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Handle that stops [`run`](AppRunner::run) from another thread.
    #[must_use]
    pub fn interrupt_handle(&self) -> ReaderInterrupt {
        self.reader.interrupt_handle()
    }

    /// Replay the recovered history, open every writer gate, and start the
    /// applications. Returns the number of entries replayed.
    pub fn recover(&mut self) -> u64 {
        let mut replayed = 0;
        for sequence in 1..=self.recovery_target {
            let Some(entry) = self.reader.get_sequenced(sequence) else {
                warn!(sequence, "recovered entry missing, ending replay early");
                break;
            };
            self.dispatch(&entry, true);
            replayed += 1;
        }

        info!(replayed, "recovery complete");
        for writer in &self.writers {
            writer.mark_recovery_complete();
        }
        for app in &mut self.apps {
            app.start();
        }
        replayed
    }

    /// Wait for the next entry and dispatch it to every application.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Interrupted`] when the runner is
    /// interrupted or the sequencer stops.
    pub fn step(&mut self) -> SequencerResult<Arc<LogEntry>> {
        let entry = self.reader.next_sequenced()?;
        self.dispatch(&entry, false);
        Ok(entry)
    }

    /// Tail the log until interrupted, then stop every application.
    /// Returns the number of live entries dispatched.
    pub fn run(&mut self) -> u64 {
        let mut live = 0;
        while self.step().is_ok() {
            live += 1;
        }
        info!(live, cursor = self.reader.cursor(), "app runner stopping");
        for app in &mut self.apps {
            app.stop();
        }
        live
    }

    fn dispatch(&mut self, entry: &LogEntry, is_recovery: bool) {
        self.dispatched += 1;
        for app in &mut self.apps {
            match app.on_sequenced(entry, is_recovery) {
                Ok(()) => {}
                Err(AppError::SessionLookup { owner_tag }) => {
                    warn!(
                        app = app.name(),
                        sequence = entry.sequence_number(),
                        owner_tag,
                        is_recovery,
                        "no destination for sequenced entry, skipping"
                    );
                }
                Err(e) => {
                    error!(
                        app = app.name(),
                        sequence = entry.sequence_number(),
                        is_recovery,
                        error = %e,
                        "app error on sequenced entry"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for AppRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRunner")
            .field("recovery_target", &self.recovery_target)
            .field("apps", &self.apps.len())
            .field("writers", &self.writers.len())
            .field("cursor", &self.reader.cursor())
            .finish()
    }
}
