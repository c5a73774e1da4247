//! Polled order book client.
//!
//! Polls an order book backend at a fixed cadence, buckets the last traded
//! price into a gap-free chart series, and keeps an editable trade ticket
//! that book rows can be promoted into. Everything runs inside one
//! [`session::TradingSession`] actor.

pub mod aggregator;
pub mod chart;
pub mod config;
pub mod console;
pub mod error;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod session;
pub mod store;
pub mod ticket;

pub use error::{BookwatchError, Result};
