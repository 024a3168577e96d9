#[cfg(test)]
mod tests_ordering {
    use seqlog_rs::codec;
    use seqlog_rs::{LogEntry, Sequencer, SequencerConfig, Submission};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn quiet_config(dir: &tempfile::TempDir) -> SequencerConfig {
        SequencerConfig::new(dir.path().join("seq").join("file.txt"))
            .with_heartbeat_interval(None)
            .with_poll_interval(Duration::from_millis(10))
            .with_reader_poll_interval(Duration::from_millis(10))
    }

    fn wait_for_count(sequencer: &Sequencer, count: u64) {
        let mut reader = sequencer.reader();
        while reader.cursor() < count {
            let next = reader
                .next_sequenced_timeout(Duration::from_secs(5))
                .expect("reader interrupted");
            assert!(next.is_some(), "timed out waiting for entry {}", reader.cursor() + 1);
        }
    }

    #[test]
    fn concurrent_writers_produce_gap_free_log() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 250;
        const TOTAL: u64 = (WRITERS * PER_WRITER) as u64;

        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);
        let path = config.path.clone();
        let mut sequencer = Sequencer::open(config).expect("open sequencer");
        assert!(sequencer.start());

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let writer = Arc::new(sequencer.writer());
                writer.mark_recovery_complete();
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        let outcome = writer
                            .submit(LogEntry::new("D", i.to_string()))
                            .expect("submit");
                        assert_eq!(outcome, Submission::Accepted);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        wait_for_count(&sequencer, TOTAL);
        assert_eq!(sequencer.sequenced_count(), TOTAL);

        // Every slot is filled with its own number, and each source's
        // entries keep their submission order.
        let mut last_by_source: HashMap<u32, usize> = HashMap::new();
        for k in 1..=TOTAL {
            let entry = sequencer.get_sequenced(k).expect("entry present");
            assert_eq!(entry.sequence_number(), k);
            let index: usize = entry.payload().parse().expect("numeric payload");
            if let Some(previous) = last_by_source.insert(entry.source_id(), index) {
                assert!(index > previous);
            }
        }
        assert_eq!(last_by_source.len(), WRITERS);
        assert!(sequencer.get_sequenced(TOTAL + 1).is_none());

        sequencer.stop().expect("stop");

        let contents = std::fs::read_to_string(path).expect("read journal");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len() as u64, TOTAL);
        for (i, line) in lines.iter().enumerate() {
            let decoded = codec::decode(line).expect("decode journal line");
            let cached = sequencer.get_sequenced(i as u64 + 1).expect("cached");
            assert_eq!(&decoded, cached.as_ref());
        }
    }

    #[test]
    fn two_submissions_without_delay_get_increasing_times() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(quiet_config(&dir)).expect("open sequencer");
        sequencer.start();

        sequencer
            .submit_unsequenced(LogEntry::new("D", "order1"))
            .expect("submit order1");
        sequencer
            .submit_unsequenced(LogEntry::new("D", "order2"))
            .expect("submit order2");
        wait_for_count(&sequencer, 2);

        assert_eq!(sequencer.sequenced_count(), 2);
        let first = sequencer.get_sequenced(1).expect("entry 1");
        let second = sequencer.get_sequenced(2).expect("entry 2");
        assert_eq!(first.payload(), "order1");
        assert_eq!(second.payload(), "order2");
        assert!(first.sequence_time() < second.sequence_time());

        sequencer.stop().expect("stop");
    }

    #[test]
    fn interleaved_writers_are_read_in_sequence_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(quiet_config(&dir)).expect("open sequencer");
        sequencer.start();

        let a = sequencer.writer();
        let b = sequencer.writer();
        a.mark_recovery_complete();
        b.mark_recovery_complete();

        let _ = a.submit(LogEntry::new("D", "a1")).expect("a1");
        let _ = b.submit(LogEntry::new("D", "b1")).expect("b1");
        let _ = a.submit(LogEntry::new("D", "a2")).expect("a2");

        let mut reader = sequencer.reader();
        let seen: Vec<(u64, u32, String)> = (0..3)
            .map(|_| {
                let entry = reader.next_sequenced().expect("next");
                (
                    entry.sequence_number(),
                    entry.source_id(),
                    entry.payload().to_string(),
                )
            })
            .collect();

        assert_eq!(
            seen,
            vec![
                (1, a.source_id(), "a1".to_string()),
                (2, b.source_id(), "b1".to_string()),
                (3, a.source_id(), "a2".to_string()),
            ]
        );
        assert_eq!(reader.cursor(), 3);

        sequencer.stop().expect("stop");
    }

    #[test]
    fn payload_with_delimiters_survives_the_journal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = quiet_config(&dir);
        let mut sequencer = Sequencer::open(config.clone()).expect("open sequencer");
        sequencer.start();

        let writer = sequencer.writer();
        writer.mark_recovery_complete();
        let _ = writer
            .submit(LogEntry::domain("FIX.4.2:EXEC->CLIENT", "8=FIX.4.2|35=D|55=IBM"))
            .expect("submit");
        wait_for_count(&sequencer, 1);
        sequencer.stop().expect("stop");
        drop(sequencer);

        let reopened = Sequencer::open(config).expect("reopen");
        let entry = reopened.get_sequenced(1).expect("entry 1");
        assert_eq!(entry.payload(), "FIX.4.2:EXEC->CLIENT|8=FIX.4.2|35=D|55=IBM");
        match entry.message().expect("parse") {
            seqlog_rs::Message::Domain { owner_tag, body } => {
                assert_eq!(owner_tag, "FIX.4.2:EXEC->CLIENT");
                assert_eq!(body, "8=FIX.4.2|35=D|55=IBM");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
