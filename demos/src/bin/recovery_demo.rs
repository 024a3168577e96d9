//! Example demonstrating recovery with the app runner.
//!
//! Run it twice against the same journal. The first run records client
//! orders and the order manager's acknowledgements. The second run replays
//! them with `is_recovery = true`; the acknowledgements the manager tries
//! to emit during replay are suppressed, so the log is not duplicated.

use seqlog_rs::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Tracks open orders per client and acknowledges new ones.
struct OrderManager {
    writer: Arc<Writer>,
    open: HashMap<String, u64>,
}

impl SequencerApp for OrderManager {
    fn name(&self) -> &str {
        "oms"
    }

    fn on_sequenced(&mut self, entry: &LogEntry, is_recovery: bool) -> Result<(), AppError> {
        let Message::Domain { owner_tag, body } = entry.message()? else {
            return Ok(());
        };
        if owner_tag == "oms" {
            return Ok(());
        }
        if !owner_tag.starts_with("client-") {
            return Err(AppError::SessionLookup { owner_tag });
        }

        *self.open.entry(owner_tag.clone()).or_default() += 1;
        let ack = format!("ack {owner_tag} {body}");
        let outcome = self.writer.submit(LogEntry::domain("oms", ack))?;
        info!(
            seq = entry.sequence_number(),
            %owner_tag,
            is_recovery,
            ?outcome,
            "order handled"
        );
        Ok(())
    }

    fn start(&mut self) {
        info!(open = ?self.open, "order manager live");
    }

    fn stop(&mut self) {
        info!(open = ?self.open, "order manager stopped");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    info!("=== Recovery Demo ===\n");

    let config = SequencerConfig::new("target/data/sequencer/recovery_demo.txt")
        .with_heartbeat_interval(None);
    let mut sequencer = match Sequencer::open(config) {
        Ok(sequencer) => sequencer,
        Err(e) => {
            error!(error = %e, "cannot open sequencer");
            return;
        }
    };
    sequencer.start();

    let gateway = Arc::new(sequencer.writer());
    let oms_writer = Arc::new(sequencer.writer());
    let mut runner = AppRunner::new(&sequencer);
    runner.register(
        OrderManager {
            writer: Arc::clone(&oms_writer),
            open: HashMap::new(),
        },
        oms_writer,
    );
    runner.add_writer(Arc::clone(&gateway));

    let replayed = runner.recover();
    info!(replayed, "history replayed");

    let interrupt = runner.interrupt_handle();
    let driver = thread::spawn(move || runner.run());

    let orders = [
        ("client-a", "buy 100 IBM"),
        ("client-b", "sell 50 MSFT"),
        ("venue-x", "fill"),
    ];
    for (client, body) in orders {
        if let Err(e) = gateway.submit(LogEntry::domain(client, body)) {
            error!(error = %e, "gateway submit failed");
        }
    }
    thread::sleep(Duration::from_millis(300));

    interrupt.interrupt();
    match driver.join() {
        Ok(live) => info!(live, total = sequencer.sequenced_count(), "\nDemo complete"),
        Err(_) => error!("runner thread panicked"),
    }
    if let Err(e) = sequencer.stop() {
        error!(error = %e, "sequencer did not stop cleanly");
    }
}
