//! Shared test utilities: an in-memory gateway and a one-shot HTTP responder.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use bookwatch::gateway::MarketGateway;
use bookwatch::models::{BookLevel, BookSnapshot, PlaceTradeRequest, TradeConfirmation};
use bookwatch::{BookwatchError, Result};

/// A one-level-each-side book whose last traded price is `ltp`.
pub fn book_with_ltp(ltp: f64) -> BookSnapshot {
    BookSnapshot::new(
        vec![BookLevel::new(ltp - 0.1, 2.5), BookLevel::new(ltp - 0.2, 1.0)],
        vec![BookLevel::new(ltp + 0.1, 2.0), BookLevel::new(ltp + 0.2, 3.0)],
        Some(ltp),
    )
}

#[derive(Clone)]
struct CannedBook {
    delay: Duration,
    outcome: std::result::Result<BookSnapshot, String>,
}

/// In-memory [`MarketGateway`] that records every call.
#[derive(Default)]
pub struct MockGateway {
    books: Mutex<HashMap<String, CannedBook>>,
    fetches: Mutex<Vec<(String, tokio::time::Instant)>>,
    trades: Mutex<Vec<PlaceTradeRequest>>,
    reject_trades: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serves `book` for `instrument` after `delay`.
    pub fn set_book(&self, instrument: &str, book: BookSnapshot, delay: Duration) {
        self.books.lock().unwrap().insert(
            instrument.to_string(),
            CannedBook {
                delay,
                outcome: Ok(book),
            },
        );
    }

    /// Makes fetches for `instrument` fail with a server error.
    pub fn fail_book(&self, instrument: &str, message: &str) {
        self.books.lock().unwrap().insert(
            instrument.to_string(),
            CannedBook {
                delay: Duration::ZERO,
                outcome: Err(message.to_string()),
            },
        );
    }

    /// Makes every trade fail with a server error.
    pub fn reject_trades(&self, message: &str) {
        *self.reject_trades.lock().unwrap() = Some(message.to_string());
    }

    /// Instruments fetched so far, in issue order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of fetches issued for `instrument` at or after `since`.
    pub fn fetch_count_since(&self, instrument: &str, since: tokio::time::Instant) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, at)| name == instrument && *at >= since)
            .count()
    }

    pub fn trades(&self) -> Vec<PlaceTradeRequest> {
        self.trades.lock().unwrap().clone()
    }
}

impl MarketGateway for MockGateway {
    async fn fetch_book(&self, instrument: &str) -> Result<BookSnapshot> {
        self.fetches
            .lock()
            .unwrap()
            .push((instrument.to_string(), tokio::time::Instant::now()));

        let canned = self.books.lock().unwrap().get(instrument).cloned();
        let Some(canned) = canned else {
            return Err(BookwatchError::Server {
                status: 400,
                message: "Invalid stock symbol".to_string(),
            });
        };

        tokio::time::sleep(canned.delay).await;
        canned.outcome.map_err(|message| BookwatchError::Server {
            status: 500,
            message,
        })
    }

    async fn place_trade(&self, request: &PlaceTradeRequest) -> Result<TradeConfirmation> {
        self.trades.lock().unwrap().push(request.clone());

        let rejection = self.reject_trades.lock().unwrap().clone();
        match rejection {
            Some(message) => Err(BookwatchError::Server {
                status: 400,
                message,
            }),
            None => Ok(TradeConfirmation {
                message: serde_json::json!("Order added to book"),
            }),
        }
    }
}

/// A captured HTTP request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Serves exactly one HTTP response on a local port.
///
/// Returns the base URL and a task resolving to the request it received.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    let body = body.to_string();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.expect("read failed");
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.expect("read failed");
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        let request_body =
            String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();

        let response = format!(
            "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write failed");
        socket.shutdown().await.ok();

        RecordedRequest {
            method,
            path,
            body: request_body,
        }
    });

    (format!("http://{addr}"), task)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
