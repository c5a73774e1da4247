//! Order book snapshot models.

use serde::{Deserialize, Serialize};

/// A single price level in the order book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

impl BookLevel {
    #[must_use]
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    /// Notional value resting at this level.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Which half of the book a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Bid,
    Ask,
}

/// Body of a successful `GET /get_orderbook/{instrument}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BookResponse {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    #[serde(default)]
    pub ltp: Option<f64>,
}

/// Point-in-time view of one instrument's resting orders.
///
/// Both sides are sorted best-first on construction (bids descending, asks
/// ascending) and never change afterwards; a newer poll replaces the whole
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
    ltp: Option<f64>,
}

impl BookSnapshot {
    /// Builds a snapshot, ordering each side best-first.
    #[must_use]
    pub fn new(mut bids: Vec<BookLevel>, mut asks: Vec<BookLevel>, ltp: Option<f64>) -> Self {
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        Self { bids, asks, ltp }
    }

    #[must_use]
    pub fn bids(&self) -> &[BookLevel] {
        &self.bids
    }

    #[must_use]
    pub fn asks(&self) -> &[BookLevel] {
        &self.asks
    }

    /// Last traded price, if the backend reported one.
    #[must_use]
    pub fn ltp(&self) -> Option<f64> {
        self.ltp
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Midpoint between the best bid and best ask.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Returns the `index`-th level (0 = best) on the given side.
    #[must_use]
    pub fn level(&self, side: BookSide, index: usize) -> Option<&BookLevel> {
        match side {
            BookSide::Bid => self.bids.get(index),
            BookSide::Ask => self.asks.get(index),
        }
    }
}

impl From<BookResponse> for BookSnapshot {
    fn from(response: BookResponse) -> Self {
        Self::new(response.bids, response.asks, response.ltp)
    }
}

/// Error body returned alongside non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
