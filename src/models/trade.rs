//! Trade placement models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the wire name expected by the backend.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side {other:?} (expected buy or sell)")),
        }
    }
}

/// Body of a `POST /place_trade` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceTradeRequest {
    pub stock: String,
    pub quantity: u64,
    pub order_side: Side,
    pub price: f64,
}

/// Successful trade placement as reported by the backend.
///
/// The backend's matching result is passed through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeConfirmation {
    #[serde(default)]
    pub message: serde_json::Value,
}
