#[cfg(test)]
mod tests_recovery {
    use seqlog_rs::{LogEntry, Sequencer, SequencerConfig, SequencerError, Submission};
    use std::fs;
    use std::time::Duration;

    fn quiet_config(dir: &tempfile::TempDir) -> SequencerConfig {
        SequencerConfig::new(dir.path().join("file.txt"))
            .with_heartbeat_interval(None)
            .with_poll_interval(Duration::from_millis(10))
            .with_reader_poll_interval(Duration::from_millis(10))
    }

    fn drain(sequencer: &Sequencer, count: u64) {
        let mut reader = sequencer.reader();
        while reader.cursor() < count {
            let next = reader
                .next_sequenced_timeout(Duration::from_secs(5))
                .expect("reader interrupted");
            assert!(next.is_some(), "timed out waiting for entry {}", reader.cursor() + 1);
        }
    }

    #[test]
    fn restart_reproduces_identical_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);

        let mut first = Sequencer::open(config.clone()).expect("open");
        first.start();
        let writer = first.writer();
        writer.mark_recovery_complete();
        for i in 1..=5 {
            let _ = writer
                .submit(LogEntry::domain("desk", format!("order{i}")))
                .expect("submit");
        }
        drain(&first, 5);
        first.stop().expect("stop");
        let before: Vec<LogEntry> = (1..=5)
            .map(|k| first.get_sequenced(k).expect("cached").as_ref().clone())
            .collect();
        drop(first);

        let mut second = Sequencer::open(config).expect("reopen");
        assert_eq!(second.sequenced_count(), 5);
        let after: Vec<LogEntry> = (1..=5)
            .map(|k| second.get_sequenced(k).expect("replayed").as_ref().clone())
            .collect();
        assert_eq!(before, after);

        // Sequencing resumes after the recovered tail, later in time.
        second.start();
        second
            .submit_unsequenced(LogEntry::new("D", "order6"))
            .expect("submit");
        drain(&second, 6);
        let sixth = second.get_sequenced(6).expect("entry 6");
        assert!(sixth.sequence_time() > after[4].sequence_time());
        second.stop().expect("stop");
    }

    #[test]
    fn gate_drops_submissions_until_recovery_completes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(quiet_config(&dir)).expect("open");
        sequencer.start();

        let writer = sequencer.writer();
        for i in 0..3 {
            let outcome = writer
                .submit(LogEntry::new("D", format!("early{i}")))
                .expect("submit");
            assert_eq!(outcome, Submission::Suppressed);
        }

        writer.mark_recovery_complete();
        for i in 0..2 {
            let outcome = writer
                .submit(LogEntry::new("D", format!("late{i}")))
                .expect("submit");
            assert_eq!(outcome, Submission::Accepted);
        }

        let mut reader = sequencer.reader();
        for expected in ["late0", "late1"] {
            let entry = reader.next_sequenced().expect("next");
            assert_eq!(entry.payload(), expected);
        }
        let extra = reader
            .next_sequenced_timeout(Duration::from_millis(100))
            .expect("not interrupted");
        assert!(extra.is_none());
        assert_eq!(sequencer.sequenced_count(), 2);

        sequencer.stop().expect("stop");
    }

    #[test]
    fn partial_tail_from_interrupted_append_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);
        let first_line = "2024-03-01T12:30:45Z|1|1|D|order1";
        fs::write(
            &config.path,
            format!("{first_line}\n2024-03-01T12:30:46Z|2|1|D|ord"),
        )
        .expect("seed journal");

        let mut sequencer = Sequencer::open(config.clone()).expect("open");
        assert_eq!(sequencer.sequenced_count(), 1);
        assert!(sequencer.get_sequenced(2).is_none());
        assert_eq!(
            fs::read_to_string(&config.path).expect("read journal"),
            format!("{first_line}\n")
        );

        sequencer.start();
        sequencer
            .submit_unsequenced(LogEntry::new("D", "order3"))
            .expect("submit");
        drain(&sequencer, 2);
        let live = sequencer.get_sequenced(2).expect("entry 2").as_ref().clone();
        assert_eq!(live.payload(), "order3");
        sequencer.stop().expect("stop");
        drop(sequencer);

        let reopened = Sequencer::open(config).expect("reopen");
        assert_eq!(reopened.sequenced_count(), 2);
        let first = reopened.get_sequenced(1).expect("entry 1");
        let second = reopened.get_sequenced(2).expect("entry 2");
        assert_eq!(first.payload(), "order1");
        assert_eq!(second.as_ref(), &live);
    }

    #[test]
    fn malformed_line_aborts_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);
        fs::write(
            &config.path,
            "2024-03-01T12:30:45Z|1|1|D|ok\nnot a log line\n",
        )
        .expect("seed journal");

        let result = Sequencer::open(config);
        assert!(matches!(result, Err(SequencerError::MalformedEntry { .. })));
    }

    #[test]
    fn sequence_gap_aborts_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);
        fs::write(
            &config.path,
            "2024-03-01T12:30:45Z|1|1|D|a\n2024-03-01T12:30:46Z|3|1|D|c\n",
        )
        .expect("seed journal");

        let result = Sequencer::open(config);
        assert!(matches!(
            result,
            Err(SequencerError::SequenceGap {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn missing_directories_are_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SequencerConfig::new(dir.path().join("a").join("b").join("file.txt"))
            .with_heartbeat_interval(None);

        let sequencer = Sequencer::open(config.clone()).expect("open");
        assert_eq!(sequencer.sequenced_count(), 0);
        assert!(config.path.exists());
    }

    #[test]
    fn config_loaded_from_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = dir.path().join("journal.txt");
        let config_path = dir.path().join("sequencer.json");
        let json = serde_json::json!({
            "path": journal,
            "heartbeat_interval_ms": null,
            "durability": "halt",
        });
        fs::write(&config_path, json.to_string()).expect("write config");

        let config = SequencerConfig::from_json_file(&config_path).expect("load config");
        assert_eq!(config.path, journal);
        assert_eq!(config.heartbeat_interval_ms, None);

        let sequencer = Sequencer::open(config).expect("open");
        assert_eq!(sequencer.sequenced_count(), 0);
    }
}
