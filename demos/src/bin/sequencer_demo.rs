//! Example demonstrating concurrent producers feeding one sequenced log.
//!
//! This example shows how to:
//! 1. Open a sequencer over a file journal and start its ingestion thread
//! 2. Submit entries from several producer threads through gated writers
//! 3. Tail the log with a reader, heartbeats included
//! 4. Stop the sequencer and wake the reader

use seqlog_rs::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

const PRODUCERS: usize = 3;
const ORDERS_PER_PRODUCER: usize = 5;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    info!("=== Sequencer Demo ===\n");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| seqlog_rs::DEFAULT_JOURNAL_PATH.to_string());
    let config =
        SequencerConfig::new(&path).with_heartbeat_interval(Some(Duration::from_millis(250)));

    let mut sequencer = match Sequencer::open(config) {
        Ok(sequencer) => sequencer,
        Err(e) => {
            error!(%path, error = %e, "cannot open sequencer");
            return;
        }
    };
    info!(
        %path,
        recovered = sequencer.sequenced_count(),
        "journal opened"
    );
    sequencer.start();

    // Tail everything from the current end of the log.
    let mut reader = sequencer.reader();
    let recovered = sequencer.sequenced_count();
    if recovered > 0 {
        let _ = reader.get_sequenced(recovered);
    }
    let tail = thread::spawn(move || {
        let mut domain = 0usize;
        while let Ok(entry) = reader.next_sequenced() {
            match entry.message() {
                Ok(Message::Heartbeat { millis }) => {
                    info!(seq = entry.sequence_number(), millis, "heartbeat");
                }
                Ok(Message::Domain { owner_tag, body }) => {
                    domain += 1;
                    info!(
                        seq = entry.sequence_number(),
                        source = entry.source_id(),
                        time = %entry.sequence_time(),
                        %owner_tag,
                        %body,
                        "order"
                    );
                }
                Ok(other) => info!(seq = entry.sequence_number(), ?other, "entry"),
                Err(e) => error!(seq = entry.sequence_number(), error = %e, "unparseable entry"),
            }
        }
        domain
    });

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let writer = Arc::new(sequencer.writer());
            writer.mark_recovery_complete();
            thread::spawn(move || {
                for i in 0..ORDERS_PER_PRODUCER {
                    let body = format!("35=D;11=ord-{p}-{i};55=IBM;38=100");
                    if let Err(e) = writer.submit(LogEntry::domain(format!("desk-{p}"), body)) {
                        error!(source = writer.source_id(), error = %e, "submit failed");
                    }
                    thread::sleep(Duration::from_millis(40));
                }
            })
        })
        .collect();
    for producer in producers {
        if producer.join().is_err() {
            error!("producer thread panicked");
        }
    }

    // Let a couple of idle heartbeats through before shutting down.
    thread::sleep(Duration::from_millis(600));

    // Stopping also ends the tailing reader's wait.
    if let Err(e) = sequencer.stop() {
        error!(error = %e, "sequencer did not stop cleanly");
    }

    match tail.join() {
        Ok(domain) => info!(
            domain,
            total = sequencer.sequenced_count(),
            "\nDemo complete"
        ),
        Err(_) => error!("reader thread panicked"),
    }
}
