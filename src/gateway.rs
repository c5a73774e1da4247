//! Backend order book service.
//!
//! [`MarketGateway`] is the seam between the session and the HTTP backend;
//! [`HttpGateway`] is the production implementation.

use std::future::Future;

use reqwest::{Response, Url};
use tracing::debug;

use crate::config::BackendConfig;
use crate::models::{
    BookResponse, BookSnapshot, ErrorResponse, PlaceTradeRequest, TradeConfirmation,
};
use crate::{BookwatchError, Result};

/// Source of book snapshots and sink for trade requests.
pub trait MarketGateway: Send + Sync + 'static {
    /// Fetches the current book for `instrument`.
    fn fetch_book(&self, instrument: &str) -> impl Future<Output = Result<BookSnapshot>> + Send;

    /// Sends a trade request and returns the backend's confirmation.
    fn place_trade(
        &self,
        request: &PlaceTradeRequest,
    ) -> impl Future<Output = Result<TradeConfirmation>> + Send;
}

/// [`MarketGateway`] over the backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    /// Builds a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::Config`] if the base URL is invalid, or
    /// [`BookwatchError::Network`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BookwatchError::Config(format!("invalid backend URL {:?}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BookwatchError::Config(format!(
                "backend URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl MarketGateway for HttpGateway {
    async fn fetch_book(&self, instrument: &str) -> Result<BookSnapshot> {
        let url = self.endpoint(&["get_orderbook", instrument]);
        debug!(%url, "Fetching order book");

        let response = self.client.get(url).send().await?;
        let body: BookResponse = read_json(response).await?;
        Ok(body.into())
    }

    async fn place_trade(&self, request: &PlaceTradeRequest) -> Result<TradeConfirmation> {
        let url = self.endpoint(&["place_trade"]);
        debug!(%url, stock = %request.stock, "Placing trade");

        let response = self.client.post(url).json(request).send().await?;
        read_json(response).await
    }
}

/// Decodes a success body, or turns a non-success status into
/// [`BookwatchError::Server`] carrying the backend's `error` message.
async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| text.trim().to_string());
        return Err(BookwatchError::Server {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&text)?)
}
