//! Pending trade ticket.
//!
//! The ticket is filled either wholesale, by promoting an order book row
//! ([`TradeTicketController::select_row`]), or field by field as the user
//! types ([`TradeTicketController::edit_field`]). A row selection always
//! overwrites side, price and quantity, including any manual edits made
//! since the previous selection.

use tracing::{info, warn};

use crate::gateway::MarketGateway;
use crate::models::{BookLevel, BookSide, PlaceTradeRequest, Side, TradeConfirmation};

/// Reason a ticket could not be turned into a trade request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TicketError {
    #[error("select buy or sell before submitting")]
    MissingSide,
    #[error("enter a quantity before submitting")]
    MissingQuantity,
    #[error("enter a price before submitting")]
    MissingPrice,
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(f64),
    #[error("quantity must be a whole number, got {0}")]
    FractionalQuantity(f64),
    #[error("quantity {0} is too large to send exactly")]
    QuantityTooLarge(f64),
    #[error("price must be a positive number, got {0}")]
    InvalidPrice(f64),
}

/// Largest quantity an `f64` holds exactly (2^53); anything above would
/// reach the backend as a different integer.
pub const MAX_QUANTITY: f64 = 9_007_199_254_740_992.0;

/// The user's in-progress order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTicket {
    pub instrument: String,
    pub side: Option<Side>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
}

impl TradeTicket {
    fn empty(instrument: String) -> Self {
        Self {
            instrument,
            side: None,
            quantity: None,
            price: None,
        }
    }

    /// Returns `true` if no field has been filled in.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.side.is_none() && self.quantity.is_none() && self.price.is_none()
    }
}

/// A clicked order book row, consumed into the ticket immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionEvent {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

impl SelectionEvent {
    /// Builds the selection for a book row.
    ///
    /// Taking an ask means buying from that seller; taking a bid means
    /// selling to that buyer.
    #[must_use]
    pub fn from_level(book_side: BookSide, level: &BookLevel) -> Self {
        let side = match book_side {
            BookSide::Ask => Side::Buy,
            BookSide::Bid => Side::Sell,
        };
        Self {
            side,
            price: level.price,
            quantity: level.quantity,
        }
    }
}

/// A single-field manual edit. `None` clears the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TicketEdit {
    Side(Option<Side>),
    Quantity(Option<f64>),
    Price(Option<f64>),
}

/// Owns the ticket and the rules for changing and submitting it.
#[derive(Debug, Clone)]
pub struct TradeTicketController {
    ticket: TradeTicket,
}

impl TradeTicketController {
    #[must_use]
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            ticket: TradeTicket::empty(instrument.into()),
        }
    }

    #[must_use]
    pub fn ticket(&self) -> &TradeTicket {
        &self.ticket
    }

    /// Points the ticket at another instrument, discarding its fields.
    pub fn set_instrument(&mut self, instrument: impl Into<String>) {
        self.ticket = TradeTicket::empty(instrument.into());
    }

    /// Overwrites side, price and quantity with the selected row.
    pub fn select_row(&mut self, event: SelectionEvent) {
        self.ticket.side = Some(event.side);
        self.ticket.price = Some(event.price);
        self.ticket.quantity = Some(event.quantity);
    }

    /// Changes one field, leaving the others as they are.
    pub fn edit_field(&mut self, edit: TicketEdit) {
        match edit {
            TicketEdit::Side(side) => self.ticket.side = side,
            TicketEdit::Quantity(quantity) => self.ticket.quantity = quantity,
            TicketEdit::Price(price) => self.ticket.price = price,
        }
    }

    /// Clears side, quantity and price.
    pub fn cancel(&mut self) {
        self.ticket = TradeTicket::empty(std::mem::take(&mut self.ticket.instrument));
    }

    /// Validates the ticket and builds the request to send, without sending it.
    ///
    /// # Errors
    ///
    /// Returns a [`TicketError`] naming the first missing or invalid field.
    pub fn prepare_submission(&self) -> Result<PlaceTradeRequest, TicketError> {
        let side = self.ticket.side.ok_or(TicketError::MissingSide)?;
        let quantity = self.ticket.quantity.ok_or(TicketError::MissingQuantity)?;
        let price = self.ticket.price.ok_or(TicketError::MissingPrice)?;

        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(TicketError::NonPositiveQuantity(quantity));
        }
        if quantity.fract() != 0.0 {
            return Err(TicketError::FractionalQuantity(quantity));
        }
        if quantity > MAX_QUANTITY {
            return Err(TicketError::QuantityTooLarge(quantity));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TicketError::InvalidPrice(price));
        }

        Ok(PlaceTradeRequest {
            stock: self.ticket.instrument.clone(),
            quantity: quantity as u64,
            order_side: side,
            price,
        })
    }

    /// Applies the outcome of a submission started with
    /// [`prepare_submission`](Self::prepare_submission).
    ///
    /// A successful trade clears the ticket, unless it was edited while the
    /// request was in flight. A failed trade leaves it as it is.
    pub fn finish_submission(&mut self, request: &PlaceTradeRequest, succeeded: bool) {
        if !succeeded {
            return;
        }
        if matches!(self.prepare_submission(), Ok(ref current) if current == request) {
            self.cancel();
        }
    }

    /// Validates, sends and settles the ticket in one step.
    ///
    /// For callers that own a controller outside a
    /// [`TradingSession`](crate::session::TradingSession); the session runs
    /// the same three steps but sends on its own task so its loop keeps
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::Validation`](crate::BookwatchError::Validation)
    /// without contacting the gateway if the ticket is incomplete, or the
    /// gateway's error if placement failed.
    pub async fn submit<G: MarketGateway>(
        &mut self,
        gateway: &G,
    ) -> crate::Result<TradeConfirmation> {
        let request = self.prepare_submission()?;
        log_submission(&request);
        let outcome = gateway.place_trade(&request).await;
        log_outcome(&request, &outcome);
        self.finish_submission(&request, outcome.is_ok());
        outcome
    }
}

pub(crate) fn log_submission(request: &PlaceTradeRequest) {
    info!(
        stock = %request.stock,
        side = %request.order_side,
        quantity = request.quantity,
        price = request.price,
        "Submitting trade"
    );
}

pub(crate) fn log_outcome(
    request: &PlaceTradeRequest,
    outcome: &crate::Result<TradeConfirmation>,
) {
    match outcome {
        Ok(_) => info!(stock = %request.stock, "Trade placed"),
        Err(e) => warn!(stock = %request.stock, "Trade submission failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(side: Side, price: f64, quantity: f64) -> SelectionEvent {
        SelectionEvent {
            side,
            price,
            quantity,
        }
    }

    #[test]
    fn selection_overrides_manual_edits() {
        let mut controller = TradeTicketController::new("Apple");

        controller.select_row(selection(Side::Buy, 101.5, 2.0));
        controller.edit_field(TicketEdit::Quantity(Some(5.0)));
        assert_eq!(controller.ticket().side, Some(Side::Buy));
        assert_eq!(controller.ticket().price, Some(101.5));
        assert_eq!(controller.ticket().quantity, Some(5.0));

        controller.select_row(selection(Side::Sell, 101.0, 3.0));
        assert_eq!(controller.ticket().side, Some(Side::Sell));
        assert_eq!(controller.ticket().price, Some(101.0));
        assert_eq!(controller.ticket().quantity, Some(3.0));
    }

    #[test]
    fn edit_touches_one_field() {
        let mut controller = TradeTicketController::new("Apple");
        controller.edit_field(TicketEdit::Price(Some(99.0)));
        controller.edit_field(TicketEdit::Side(Some(Side::Sell)));
        controller.edit_field(TicketEdit::Price(None));

        let ticket = controller.ticket();
        assert_eq!(ticket.side, Some(Side::Sell));
        assert_eq!(ticket.price, None);
        assert_eq!(ticket.quantity, None);
    }

    #[test]
    fn row_side_follows_book_side() {
        let level = BookLevel::new(101.3, 1.5);
        assert_eq!(
            SelectionEvent::from_level(BookSide::Ask, &level),
            selection(Side::Buy, 101.3, 1.5)
        );
        assert_eq!(
            SelectionEvent::from_level(BookSide::Bid, &level).side,
            Side::Sell
        );
    }

    #[test]
    fn cancel_keeps_instrument() {
        let mut controller = TradeTicketController::new("Tesla");
        controller.select_row(selection(Side::Buy, 10.0, 1.0));
        controller.cancel();

        assert!(controller.ticket().is_blank());
        assert_eq!(controller.ticket().instrument, "Tesla");
    }

    #[test]
    fn prepare_reports_missing_fields() {
        let mut controller = TradeTicketController::new("Apple");
        assert_eq!(controller.prepare_submission(), Err(TicketError::MissingSide));

        controller.edit_field(TicketEdit::Side(Some(Side::Buy)));
        assert_eq!(
            controller.prepare_submission(),
            Err(TicketError::MissingQuantity)
        );

        controller.edit_field(TicketEdit::Quantity(Some(3.0)));
        assert_eq!(controller.prepare_submission(), Err(TicketError::MissingPrice));
    }

    #[test]
    fn prepare_rejects_bad_values() {
        let mut controller = TradeTicketController::new("Apple");
        controller.select_row(selection(Side::Buy, 100.0, 0.0));
        assert_eq!(
            controller.prepare_submission(),
            Err(TicketError::NonPositiveQuantity(0.0))
        );

        controller.edit_field(TicketEdit::Quantity(Some(1.5)));
        assert_eq!(
            controller.prepare_submission(),
            Err(TicketError::FractionalQuantity(1.5))
        );

        controller.edit_field(TicketEdit::Quantity(Some(1e20)));
        assert_eq!(
            controller.prepare_submission(),
            Err(TicketError::QuantityTooLarge(1e20))
        );

        controller.edit_field(TicketEdit::Quantity(Some(MAX_QUANTITY)));
        assert_eq!(
            controller.prepare_submission().map(|r| r.quantity),
            Ok(1 << 53)
        );

        controller.edit_field(TicketEdit::Quantity(Some(2.0)));
        controller.edit_field(TicketEdit::Price(Some(-1.0)));
        assert_eq!(
            controller.prepare_submission(),
            Err(TicketError::InvalidPrice(-1.0))
        );
    }

    #[test]
    fn prepare_builds_request() {
        let mut controller = TradeTicketController::new("Apple");
        controller.select_row(selection(Side::Sell, 101.2, 4.0));

        let request = controller.prepare_submission().unwrap();
        assert_eq!(
            request,
            PlaceTradeRequest {
                stock: "Apple".to_string(),
                quantity: 4,
                order_side: Side::Sell,
                price: 101.2,
            }
        );
    }

    #[test]
    fn finish_clears_only_unchanged_ticket_on_success() {
        let mut controller = TradeTicketController::new("Apple");
        controller.select_row(selection(Side::Buy, 50.0, 2.0));
        let request = controller.prepare_submission().unwrap();

        controller.finish_submission(&request, false);
        assert!(!controller.ticket().is_blank());

        controller.edit_field(TicketEdit::Quantity(Some(3.0)));
        controller.finish_submission(&request, true);
        assert_eq!(controller.ticket().quantity, Some(3.0));

        let request = controller.prepare_submission().unwrap();
        controller.finish_submission(&request, true);
        assert!(controller.ticket().is_blank());
    }
}
