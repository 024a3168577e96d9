#[cfg(test)]
mod tests_app_runner {
    use seqlog_rs::{
        AppError, AppRunner, LogEntry, Message, Sequencer, SequencerApp, SequencerConfig, Writer,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Acknowledges every `in:*` domain body from `client`.
    struct Echo {
        writer: Arc<Writer>,
        seen: Arc<Mutex<Vec<(String, bool)>>>,
    }

    impl SequencerApp for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn on_sequenced(&mut self, entry: &LogEntry, is_recovery: bool) -> Result<(), AppError> {
            let Message::Domain { owner_tag, body } = entry.message()? else {
                return Ok(());
            };
            self.seen
                .lock()
                .expect("seen lock")
                .push((body.clone(), is_recovery));
            if owner_tag == "client" && body.starts_with("in:") {
                let _ = self
                    .writer
                    .submit(LogEntry::domain("echo", format!("ack:{body}")))?;
            }
            Ok(())
        }
    }

    /// Knows no owners at all.
    struct Router;

    impl SequencerApp for Router {
        fn on_sequenced(&mut self, entry: &LogEntry, _is_recovery: bool) -> Result<(), AppError> {
            match entry.message()? {
                Message::Domain { owner_tag, .. } => Err(AppError::SessionLookup { owner_tag }),
                _ => Ok(()),
            }
        }
    }

    fn config(dir: &tempfile::TempDir) -> SequencerConfig {
        SequencerConfig::new(dir.path().join("file.txt"))
            .with_heartbeat_interval(None)
            .with_poll_interval(Duration::from_millis(10))
            .with_reader_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn recovery_replays_history_without_duplicating_reactions() {
        let dir = tempfile::tempdir().expect("tempdir");

        // First run: live traffic and live reactions.
        {
            let mut sequencer = Sequencer::open(config(&dir)).expect("open");
            sequencer.start();

            let seen = Arc::new(Mutex::new(Vec::new()));
            let gateway = Arc::new(sequencer.writer());
            let echo_writer = Arc::new(sequencer.writer());
            let mut runner = AppRunner::new(&sequencer);
            runner.register(
                Echo {
                    writer: Arc::clone(&echo_writer),
                    seen: Arc::clone(&seen),
                },
                echo_writer,
            );
            runner.register(Router, Arc::new(sequencer.writer()));
            runner.add_writer(Arc::clone(&gateway));

            assert_eq!(runner.recover(), 0);
            for body in ["in:1", "in:2"] {
                let _ = gateway
                    .submit(LogEntry::domain("client", body))
                    .expect("gateway submit");
            }
            for _ in 0..4 {
                runner.step().expect("step");
            }
            assert_eq!(sequencer.sequenced_count(), 4);
            sequencer.stop().expect("stop");

            let seen = seen.lock().expect("seen lock").clone();
            let bodies: Vec<&str> = seen.iter().map(|(b, _)| b.as_str()).collect();
            assert_eq!(bodies, vec!["in:1", "in:2", "ack:in:1", "ack:in:2"]);
            assert!(seen.iter().all(|(_, recovery)| !recovery));
        }

        // Second run: the same history is replayed as recovery and the
        // reactions it provokes are suppressed.
        let mut sequencer = Sequencer::open(config(&dir)).expect("reopen");
        sequencer.start();
        assert_eq!(sequencer.sequenced_count(), 4);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let echo_writer = Arc::new(sequencer.writer());
        let mut runner = AppRunner::new(&sequencer);
        runner.register(
            Echo {
                writer: Arc::clone(&echo_writer),
                seen: Arc::clone(&seen),
            },
            Arc::clone(&echo_writer),
        );
        assert_eq!(runner.recovery_target(), 4);
        assert!(!echo_writer.is_recovery_complete());

        assert_eq!(runner.recover(), 4);
        assert!(echo_writer.is_recovery_complete());

        let mut reader = sequencer.reader();
        assert!(reader.get_sequenced(4).is_some());
        let extra = reader
            .next_sequenced_timeout(Duration::from_millis(100))
            .expect("not interrupted");
        assert!(extra.is_none());
        assert_eq!(sequencer.sequenced_count(), 4);

        let seen = seen.lock().expect("seen lock").clone();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(_, recovery)| *recovery));

        runner.interrupt_handle().interrupt();
        assert_eq!(runner.run(), 0);
        sequencer.stop().expect("stop");
    }
}
