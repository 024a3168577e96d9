#[cfg(test)]
mod tests_reader {
    use seqlog_rs::{
        HEARTBEAT_MESSAGE_TYPE, LogEntry, Message, SEQUENCER_SOURCE, Sequencer, SequencerConfig,
        SequencerError,
    };
    use std::thread;
    use std::time::Duration;

    fn config(dir: &tempfile::TempDir, heartbeat: Option<Duration>) -> SequencerConfig {
        SequencerConfig::new(dir.path().join("file.txt"))
            .with_heartbeat_interval(heartbeat)
            .with_poll_interval(Duration::from_millis(10))
            .with_reader_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn idle_log_receives_heartbeats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer =
            Sequencer::open(config(&dir, Some(Duration::from_millis(50)))).expect("open");
        sequencer.start();

        let mut reader = sequencer.reader();
        for _ in 0..2 {
            let entry = reader
                .next_sequenced_timeout(Duration::from_secs(2))
                .expect("not interrupted")
                .expect("heartbeat within timeout");
            assert_eq!(entry.source_id(), SEQUENCER_SOURCE);
            assert_eq!(entry.message_type(), HEARTBEAT_MESSAGE_TYPE);
            assert!(entry.is_heartbeat());
            assert!(matches!(
                entry.message().expect("parse heartbeat"),
                Message::Heartbeat { millis } if millis > 0
            ));
        }

        sequencer.stop().expect("stop");
    }

    #[test]
    fn disabled_heartbeats_leave_idle_log_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(config(&dir, None)).expect("open");
        sequencer.start();

        let mut reader = sequencer.reader();
        let next = reader
            .next_sequenced_timeout(Duration::from_millis(150))
            .expect("not interrupted");
        assert!(next.is_none());
        assert_eq!(sequencer.sequenced_count(), 0);

        sequencer.stop().expect("stop");
    }

    #[test]
    fn stop_wakes_blocked_reader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(config(&dir, None)).expect("open");
        sequencer.start();

        let mut reader = sequencer.reader();
        let waiter = thread::spawn(move || {
            let result = reader.next_sequenced();
            (result.map(|e| e.sequence_number()), reader.cursor())
        });

        thread::sleep(Duration::from_millis(50));
        sequencer.stop().expect("stop");
        assert!(!sequencer.is_running());

        let (result, cursor) = waiter.join().expect("reader thread");
        assert!(matches!(result, Err(SequencerError::Interrupted)));
        assert_eq!(cursor, 0);
    }

    #[test]
    fn reader_tails_entries_submitted_after_it_blocks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(config(&dir, None)).expect("open");
        sequencer.start();

        let mut reader = sequencer.reader();
        let tail = thread::spawn(move || {
            (0..3)
                .map(|_| {
                    reader
                        .next_sequenced()
                        .map(|e| e.payload().to_string())
                        .expect("next")
                })
                .collect::<Vec<_>>()
        });

        let writer = sequencer.writer();
        writer.mark_recovery_complete();
        for payload in ["x", "y", "z"] {
            thread::sleep(Duration::from_millis(10));
            let _ = writer.submit(LogEntry::new("D", payload)).expect("submit");
        }

        let seen = tail.join().expect("tail thread");
        assert_eq!(seen, vec!["x", "y", "z"]);
        sequencer.stop().expect("stop");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_reader_tails_and_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sequencer = Sequencer::open(config(&dir, None)).expect("open");
        sequencer.start();

        let mut reader = sequencer.reader();
        let consumer = tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                match reader.next_sequenced_async().await {
                    Ok(entry) => seen.push(entry.sequence_number()),
                    Err(e) => return (seen, e),
                }
            }
        });

        let writer = sequencer.writer();
        writer.mark_recovery_complete();
        for i in 0..3 {
            let _ = writer
                .submit(LogEntry::new("D", format!("async{i}")))
                .expect("submit");
        }

        let mut tail = sequencer.reader();
        while tail.cursor() < 3 {
            let next = tail
                .next_sequenced_timeout(Duration::from_secs(5))
                .expect("not interrupted");
            assert!(next.is_some());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        sequencer.stop().expect("stop");

        let (seen, err) = tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer finished")
            .expect("consumer task");
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(matches!(err, SequencerError::Interrupted));
    }
}
