//! Fixed-cadence order book polling.
//!
//! [`PollScheduler`] keeps at most one repeating timer alive. Every tick
//! spawns a fetch for the active instrument; results travel back to the
//! session as [`PollResult`]s, numbered from a counter that keeps
//! increasing across activations. Cancelling the timer stops new fetches
//! but leaves already-issued ones to finish; the receiver decides whether
//! a late result is still wanted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::Result;
use crate::gateway::MarketGateway;
use crate::models::BookSnapshot;

/// Outcome of one fetch.
#[derive(Debug)]
pub struct PollResult {
    pub instrument: String,
    pub seq: u64,
    pub outcome: Result<BookSnapshot>,
}

struct ActivePoll {
    instrument: String,
    task: JoinHandle<()>,
}

/// Owns the repeating fetch trigger for the selected instrument.
pub struct PollScheduler<G> {
    gateway: Arc<G>,
    period: Duration,
    results: mpsc::UnboundedSender<PollResult>,
    next_seq: Arc<AtomicU64>,
    active: Option<ActivePoll>,
}

impl<G: MarketGateway> PollScheduler<G> {
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        period: Duration,
        results: mpsc::UnboundedSender<PollResult>,
    ) -> Self {
        Self {
            gateway,
            period,
            results,
            next_seq: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Starts polling `instrument`, first fetch immediately, replacing any
    /// previous trigger.
    ///
    /// Returns the sequence number the first fetch of this activation will
    /// carry; every earlier number belongs to a previous activation.
    pub fn activate(&mut self, instrument: &str) -> u64 {
        self.deactivate();

        let floor = self.next_seq.load(Ordering::SeqCst);
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.gateway),
            instrument.to_string(),
            self.period,
            Arc::clone(&self.next_seq),
            self.results.clone(),
        ));
        info!(instrument, period_ms = self.period.as_millis() as u64, "Polling started");

        self.active = Some(ActivePoll {
            instrument: instrument.to_string(),
            task,
        });
        floor
    }

    /// Cancels the repeating trigger, if any. In-flight fetches still report.
    pub fn deactivate(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
            info!(instrument = %active.instrument, "Polling stopped");
        }
    }

    /// The instrument currently being polled.
    #[must_use]
    pub fn active_instrument(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.instrument.as_str())
    }
}

impl<G> Drop for PollScheduler<G> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

/// Issues one fetch per period until aborted.
async fn poll_loop<G: MarketGateway>(
    gateway: Arc<G>,
    instrument: String,
    period: Duration,
    next_seq: Arc<AtomicU64>,
    results: mpsc::UnboundedSender<PollResult>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if results.is_closed() {
            break;
        }

        let seq = next_seq.fetch_add(1, Ordering::SeqCst);
        debug!(instrument = %instrument, seq, "Issuing book fetch");

        // Fetches are detached so a slow response never delays the next tick.
        let gateway = Arc::clone(&gateway);
        let instrument = instrument.clone();
        let results = results.clone();
        tokio::spawn(async move {
            let outcome = gateway.fetch_book(&instrument).await;
            let _ = results.send(PollResult {
                instrument,
                seq,
                outcome,
            });
        });
    }
}
