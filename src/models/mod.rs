//! Shared models for the order book backend.
//!
//! Contains the book snapshot, trade placement request/response types, and
//! the reference data (instrument list, historical series) read at startup.

pub mod book;
pub mod history;
pub mod trade;

pub use book::{BookLevel, BookResponse, BookSide, BookSnapshot, ErrorResponse};
pub use history::{HistoricalSeries, Instrument, load_instruments};
pub use trade::{PlaceTradeRequest, Side, TradeConfirmation};
