use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use bookwatch::BookwatchError;
use bookwatch::chart::display_series;
use bookwatch::config::fetch_config;
use bookwatch::console::{self, Command, HELP};
use bookwatch::gateway::HttpGateway;
use bookwatch::models::{BookSnapshot, HistoricalSeries, Instrument, load_instruments};
use bookwatch::session::{SessionHandle, TradingSession, Update};
use bookwatch::ticket::TradeTicket;

/// Samples shown by `chart` without an explicit count.
const DEFAULT_CHART_ROWS: usize = 20;

#[tokio::main]
async fn main() -> Result<(), BookwatchError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;

    let instruments = match &app_config.data.instruments_path {
        Some(path) => load_instruments(path)?,
        None => Vec::new(),
    };
    let history = match &app_config.data.history_path {
        Some(path) => HistoricalSeries::load(path)?,
        None => HistoricalSeries::default(),
    };

    let gateway = Arc::new(HttpGateway::new(&app_config.backend)?);
    let (updates_tx, mut updates) = mpsc::unbounded_channel();
    let (session, handle) = TradingSession::new(app_config.session.clone(), gateway, updates_tx);
    let task = tokio::spawn(session.run());

    let mut console = Console {
        handle,
        instrument: app_config.session.instrument.clone(),
        instruments,
        history,
    };
    println!("{HELP}");

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut pending = Vec::new();
    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(update) => render_update(&update),
                    None => break,
                }
            }

            line = console::read_line(&mut stdin, &mut pending) => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read console input: {e}");
                        break;
                    }
                };
                match console::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = console.execute(command).await {
                            println!("error: {e}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    info!("Shutting down");
    let _ = console.handle.shutdown();
    let _ = task.await;

    Ok(())
}

/// Console-side state: the session handle plus the reference data the
/// console shows itself.
struct Console {
    handle: SessionHandle,
    instrument: String,
    instruments: Vec<Instrument>,
    history: HistoricalSeries,
}

impl Console {
    async fn execute(&mut self, command: Command) -> bookwatch::Result<()> {
        match command {
            Command::Use(name) => {
                if !self.instruments.is_empty() && !self.instruments.iter().any(|i| i.name == name)
                {
                    println!("unknown instrument {name:?} (see `instruments`)");
                    return Ok(());
                }
                self.handle.select_instrument(name.clone())?;
                self.instrument = name;
            }
            Command::Instruments => {
                if self.instruments.is_empty() {
                    println!("no instrument list loaded");
                }
                for instrument in &self.instruments {
                    let marker = if instrument.name == self.instrument { "*" } else { " " };
                    println!("{marker} {}", instrument.name);
                }
            }
            Command::Book => {
                let book = self.handle.book().borrow().clone();
                match book {
                    Some(book) => print_book(&self.instrument, &book),
                    None => println!("no book data yet for {}", self.instrument),
                }
            }
            Command::SelectLevel(side, index) => {
                if self.handle.select_level(side, index).await?.is_none() {
                    println!("no {side:?} level {index} in the current book");
                }
            }
            Command::Edit(edit) => self.handle.edit_field(edit)?,
            Command::Ticket => print_ticket(&self.handle.ticket().await?),
            Command::Submit => {
                let confirmation = self.handle.submit().await?;
                println!("trade placed: {}", confirmation.message);
            }
            Command::Cancel => self.handle.cancel_ticket()?,
            Command::Chart(limit) => {
                let limit = limit.unwrap_or(DEFAULT_CHART_ROWS);
                let live = self.handle.chart(Some(limit)).await?;
                let shown = display_series(&live, self.history.for_instrument(&self.instrument));
                let start = shown.len().saturating_sub(limit);
                if shown.is_empty() {
                    println!("no chart data yet for {}", self.instrument);
                }
                for sample in &shown[start..] {
                    println!("{:>12}  {:.2}", sample.timestamp, sample.value);
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }
}

fn render_update(update: &Update) {
    match update {
        Update::Book {
            instrument,
            snapshot,
        } => debug!(
            instrument = %instrument,
            best_bid = ?snapshot.best_bid().map(|l| l.price),
            best_ask = ?snapshot.best_ask().map(|l| l.price),
            ltp = ?snapshot.ltp(),
            "Book updated"
        ),
        Update::Sample { instrument, sample } => info!(
            instrument = %instrument,
            time = sample.timestamp,
            value = sample.value,
            "Chart sample"
        ),
        Update::Ticket(ticket) => print_ticket(ticket),
    }
}

fn print_book(instrument: &str, book: &BookSnapshot) {
    println!("{instrument} order book");
    println!("  {:>4}  {:>10} {:>10} {:>12}", "row", "price", "quantity", "total");
    for (i, level) in book.asks().iter().enumerate().rev() {
        println!(
            "  ask {i:>2}  {:>8.2} {:>10} {:>12.2}",
            level.price,
            level.quantity,
            level.total()
        );
    }
    match book.mid_price() {
        Some(mid) => println!("  mid      {mid:>8.2}"),
        None => println!("  mid           -"),
    }
    for (i, level) in book.bids().iter().enumerate() {
        println!(
            "  bid {i:>2}  {:>8.2} {:>10} {:>12.2}",
            level.price,
            level.quantity,
            level.total()
        );
    }
    if let Some(ltp) = book.ltp() {
        println!("  last traded {ltp:.2}");
    }
}

fn print_ticket(ticket: &TradeTicket) {
    let side = ticket.side.map_or("-".to_string(), |s| s.to_string());
    let quantity = ticket.quantity.map_or("-".to_string(), |q| q.to_string());
    let price = ticket.price.map_or("-".to_string(), |p| format!("{p:.2}"));
    println!(
        "ticket {}: side {side}, quantity {quantity}, price {price}",
        ticket.instrument
    );
}
