//! The trading session actor.
//!
//! [`TradingSession`] owns the book store, the poll scheduler, the price
//! aggregator and the trade ticket, and processes everything that can
//! change them (user commands, poll completions, trade completions, clock
//! ticks) one event at a time on a single task. Network calls run in their
//! own tasks and report back over channels, so the loop itself never waits
//! on I/O.
//!
//! Callers talk to the session through a cloneable [`SessionHandle`] and
//! receive [`Update`]s on the channel passed to [`TradingSession::new`].

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::aggregator::PriceAggregator;
use crate::chart::PriceSample;
use crate::config::SessionConfig;
use crate::gateway::MarketGateway;
use crate::models::{BookSide, BookSnapshot, PlaceTradeRequest, TradeConfirmation};
use crate::poller::{PollResult, PollScheduler};
use crate::store::{BookReader, BookSnapshotStore};
use crate::ticket::{self, SelectionEvent, TicketEdit, TradeTicket, TradeTicketController};
use crate::{BookwatchError, Result};

/// State changes pushed to whoever renders the session.
#[derive(Debug, Clone)]
pub enum Update {
    /// A new book snapshot was accepted.
    Book {
        instrument: String,
        snapshot: Arc<BookSnapshot>,
    },
    /// The chart gained a sample.
    Sample {
        instrument: String,
        sample: PriceSample,
    },
    /// The ticket changed.
    Ticket(TradeTicket),
}

/// Commands sent from a [`SessionHandle`] to the actor.
enum SessionCommand {
    SelectInstrument(String),
    SelectRow(SelectionEvent),
    SelectLevel {
        side: BookSide,
        index: usize,
        reply: oneshot::Sender<Option<SelectionEvent>>,
    },
    EditField(TicketEdit),
    CancelTicket,
    Submit(oneshot::Sender<Result<TradeConfirmation>>),
    Ticket(oneshot::Sender<TradeTicket>),
    Chart {
        limit: Option<usize>,
        reply: oneshot::Sender<Vec<PriceSample>>,
    },
    Shutdown,
}

/// A trade request that has come back from the gateway.
struct SubmissionDone {
    request: PlaceTradeRequest,
    outcome: Result<TradeConfirmation>,
    reply: oneshot::Sender<Result<TradeConfirmation>>,
}

/// Wall-clock milliseconds derived from a monotonic instant, so chart time
/// never runs backwards when the system clock is adjusted.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    anchor_unix_ms: u64,
    anchor: tokio::time::Instant,
}

impl SessionClock {
    fn start() -> Self {
        let anchor_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            anchor_unix_ms,
            anchor: tokio::time::Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.anchor_unix_ms + self.anchor.elapsed().as_millis() as u64
    }
}

/// Single-task owner of all session state.
pub struct TradingSession<G> {
    instrument: String,
    gateway: Arc<G>,
    bucket_width: Duration,
    clock_tick: Duration,
    clock: SessionClock,
    store: BookSnapshotStore,
    poller: PollScheduler<G>,
    aggregator: PriceAggregator,
    ticket: TradeTicketController,
    updates: mpsc::UnboundedSender<Update>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    poll_results: mpsc::UnboundedReceiver<PollResult>,
    submissions_tx: mpsc::UnboundedSender<SubmissionDone>,
    submissions: mpsc::UnboundedReceiver<SubmissionDone>,
}

impl<G: MarketGateway> TradingSession<G> {
    /// Creates a session for `config.instrument` and the handle that drives it.
    ///
    /// Nothing happens until [`run`](Self::run) is awaited, normally on its
    /// own task.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        gateway: Arc<G>,
        updates: mpsc::UnboundedSender<Update>,
    ) -> (Self, SessionHandle) {
        let (cmd_tx, commands) = mpsc::unbounded_channel();
        let (poll_tx, poll_results) = mpsc::unbounded_channel();
        let (submissions_tx, submissions) = mpsc::unbounded_channel();

        let clock = SessionClock::start();
        let store = BookSnapshotStore::new();
        let handle = SessionHandle {
            commands: cmd_tx,
            book: store.subscribe(),
        };

        let session = Self {
            poller: PollScheduler::new(Arc::clone(&gateway), config.poll_interval, poll_tx),
            aggregator: PriceAggregator::new(config.bucket_width, clock.now_ms()),
            ticket: TradeTicketController::new(config.instrument.clone()),
            instrument: config.instrument,
            gateway,
            bucket_width: config.bucket_width,
            clock_tick: config.clock_tick,
            clock,
            store,
            updates,
            commands,
            poll_results,
            submissions_tx,
            submissions,
        };

        (session, handle)
    }

    /// Runs the event loop until shutdown is requested or every handle is
    /// dropped. Polling and the aggregation clock stop when this returns.
    pub async fn run(mut self) {
        let floor = self.poller.activate(&self.instrument);
        self.store.reset(floor);
        self.aggregator = PriceAggregator::new(self.bucket_width, self.clock.now_ms());
        info!(instrument = %self.instrument, "Session started");

        let mut clock = tokio::time::interval(self.clock_tick);
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }

                Some(result) = self.poll_results.recv() => self.handle_poll(result),

                Some(done) = self.submissions.recv() => self.handle_submission(done),

                _ = clock.tick() => self.handle_clock(),
            }
        }

        self.poller.deactivate();
        info!(instrument = %self.instrument, "Session stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::SelectInstrument(name) => self.switch_instrument(name),
            SessionCommand::SelectRow(event) => {
                self.ticket.select_row(event);
                self.publish_ticket();
            }
            SessionCommand::SelectLevel { side, index, reply } => {
                let event = self
                    .store
                    .current()
                    .and_then(|book| book.level(side, index).copied())
                    .map(|level| SelectionEvent::from_level(side, &level));
                if let Some(event) = event {
                    self.ticket.select_row(event);
                    self.publish_ticket();
                }
                let _ = reply.send(event);
            }
            SessionCommand::EditField(edit) => {
                self.ticket.edit_field(edit);
                self.publish_ticket();
            }
            SessionCommand::CancelTicket => {
                self.ticket.cancel();
                self.publish_ticket();
            }
            SessionCommand::Submit(reply) => self.start_submission(reply),
            SessionCommand::Ticket(reply) => {
                let _ = reply.send(self.ticket.ticket().clone());
            }
            SessionCommand::Chart { limit, reply } => {
                let series = self.aggregator.series();
                let samples = match limit {
                    Some(n) => series.tail(n),
                    None => series.samples(),
                };
                let _ = reply.send(samples.to_vec());
            }
            SessionCommand::Shutdown => {}
        }
    }

    /// Moves polling, the book, the chart and the ticket to another instrument.
    fn switch_instrument(&mut self, name: String) {
        if name == self.instrument {
            debug!(instrument = %name, "Instrument already selected");
            return;
        }

        info!(from = %self.instrument, to = %name, "Switching instrument");
        let floor = self.poller.activate(&name);
        self.store.reset(floor);
        self.aggregator = PriceAggregator::new(self.bucket_width, self.clock.now_ms());
        self.ticket.set_instrument(name.clone());
        self.instrument = name;
        self.publish_ticket();
    }

    fn handle_poll(&mut self, result: PollResult) {
        if result.instrument != self.instrument {
            debug!(
                instrument = %result.instrument,
                seq = result.seq,
                "Discarding book for deselected instrument"
            );
            return;
        }

        let snapshot = match result.outcome {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(instrument = %result.instrument, seq = result.seq, "Book poll failed: {e}");
                return;
            }
        };

        let Some(ltp) = self.store.update(result.seq, snapshot) else {
            return;
        };
        if let Some(snapshot) = self.store.current() {
            let _ = self.updates.send(Update::Book {
                instrument: self.instrument.clone(),
                snapshot,
            });
        }
        if let Some(ltp) = ltp {
            self.aggregator.ingest(ltp);
        }
    }

    fn handle_clock(&mut self) {
        match self.aggregator.tick(self.clock.now_ms()) {
            Ok(Some(sample)) => {
                let _ = self.updates.send(Update::Sample {
                    instrument: self.instrument.clone(),
                    sample,
                });
            }
            Ok(None) => {}
            Err(e) => error!(instrument = %self.instrument, "Dropped chart sample: {e}"),
        }
    }

    /// Validates the ticket and, if it is complete, sends it on its own task.
    fn start_submission(&mut self, reply: oneshot::Sender<Result<TradeConfirmation>>) {
        let request = match self.ticket.prepare_submission() {
            Ok(request) => request,
            Err(e) => {
                info!("Ticket rejected: {e}");
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        ticket::log_submission(&request);
        let gateway = Arc::clone(&self.gateway);
        let done = self.submissions_tx.clone();
        tokio::spawn(async move {
            let outcome = gateway.place_trade(&request).await;
            let _ = done.send(SubmissionDone {
                request,
                outcome,
                reply,
            });
        });
    }

    fn handle_submission(&mut self, done: SubmissionDone) {
        ticket::log_outcome(&done.request, &done.outcome);
        let before = self.ticket.ticket().clone();
        self.ticket.finish_submission(&done.request, done.outcome.is_ok());
        if *self.ticket.ticket() != before {
            self.publish_ticket();
        }
        let _ = done.reply.send(done.outcome);
    }

    fn publish_ticket(&self) {
        let _ = self.updates.send(Update::Ticket(self.ticket.ticket().clone()));
    }
}

/// Cloneable handle for sending commands to a running [`TradingSession`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    book: BookReader,
}

impl SessionHandle {
    /// Switches polling and charting to another instrument.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub fn select_instrument(&self, name: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::SelectInstrument(name.into()))
    }

    /// Copies a book row into the ticket.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub fn select_row(&self, event: SelectionEvent) -> Result<()> {
        self.send(SessionCommand::SelectRow(event))
    }

    /// Copies the `index`-th level (0 = best) of the current book into the
    /// ticket. Returns `None` if there is no such level.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub async fn select_level(
        &self,
        side: BookSide,
        index: usize,
    ) -> Result<Option<SelectionEvent>> {
        self.request(|reply| SessionCommand::SelectLevel { side, index, reply })
            .await
    }

    /// Changes one ticket field.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub fn edit_field(&self, edit: TicketEdit) -> Result<()> {
        self.send(SessionCommand::EditField(edit))
    }

    /// Clears the ticket.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub fn cancel_ticket(&self) -> Result<()> {
        self.send(SessionCommand::CancelTicket)
    }

    /// Submits the ticket and waits for the backend's answer.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::Validation`] if the ticket is incomplete
    /// (nothing is sent), the gateway's error if placement failed, or
    /// [`BookwatchError::SessionClosed`].
    pub async fn submit(&self) -> Result<TradeConfirmation> {
        self.request(SessionCommand::Submit).await?
    }

    /// Current ticket contents.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub async fn ticket(&self) -> Result<TradeTicket> {
        self.request(SessionCommand::Ticket).await
    }

    /// Live chart samples, optionally only the most recent `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session has stopped.
    pub async fn chart(&self, limit: Option<usize>) -> Result<Vec<PriceSample>> {
        self.request(|reply| SessionCommand::Chart { limit, reply }).await
    }

    /// Read-only view of the latest book snapshot.
    #[must_use]
    pub fn book(&self) -> BookReader {
        self.book.clone()
    }

    /// Tears the session down: polling and the aggregation clock stop.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::SessionClosed`] if the session had already
    /// stopped.
    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| BookwatchError::SessionClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| BookwatchError::SessionClosed)
    }
}
