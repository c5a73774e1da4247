//! Direct ticket submission against the in-memory gateway.

mod common;

use bookwatch::BookwatchError;
use bookwatch::models::{BookLevel, BookSide, Side};
use bookwatch::ticket::{SelectionEvent, TicketEdit, TicketError, TradeTicketController};

use common::MockGateway;

#[tokio::test]
async fn test_submit_sends_and_clears_ticket() {
    let gateway = MockGateway::new();
    let mut controller = TradeTicketController::new("Apple");
    controller.select_row(SelectionEvent::from_level(
        BookSide::Ask,
        &BookLevel::new(101.3, 2.0),
    ));

    let confirmation = controller.submit(gateway.as_ref()).await.unwrap();
    assert_eq!(confirmation.message, "Order added to book");
    assert!(controller.ticket().is_blank());
    assert_eq!(controller.ticket().instrument, "Apple");

    let trades = gateway.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].order_side, Side::Buy);
    assert_eq!(trades[0].quantity, 2);
    assert_eq!(trades[0].price, 101.3);
}

#[tokio::test]
async fn test_submit_validation_failure_sends_nothing() {
    let gateway = MockGateway::new();
    let mut controller = TradeTicketController::new("Apple");
    controller.edit_field(TicketEdit::Quantity(Some(4.0)));

    let err = controller.submit(gateway.as_ref()).await.unwrap_err();
    assert!(matches!(
        err,
        BookwatchError::Validation(TicketError::MissingSide)
    ));
    assert!(gateway.trades().is_empty());
    assert_eq!(controller.ticket().quantity, Some(4.0));
}

#[tokio::test]
async fn test_submit_rejection_keeps_ticket() {
    let gateway = MockGateway::new();
    gateway.reject_trades("Invalid order side (must be 'BUY' or 'SELL')");
    let mut controller = TradeTicketController::new("Apple");
    controller.select_row(SelectionEvent::from_level(
        BookSide::Bid,
        &BookLevel::new(100.9, 1.0),
    ));

    let err = controller.submit(gateway.as_ref()).await.unwrap_err();
    assert!(matches!(err, BookwatchError::Server { status: 400, .. }));
    assert_eq!(controller.ticket().side, Some(Side::Sell));
    assert_eq!(controller.ticket().price, Some(100.9));
}
