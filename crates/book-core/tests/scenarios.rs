// crates/book-core/tests/scenarios.rs
//
// End-to-end scenarios driven through the text event format: each data
// file carries the event stream and the expected terminal counts on its
// result line.

use book_core::{Order, OrderModify, Orderbook, Trades};
use book_protocol::text_codec::{parse_script, Event, ParseError};

/// Replay a script against a fresh book, asserting the terminal counts
/// from the result line. Returns the book and every trade produced, in
/// order, for scenario-specific checks.
fn replay(input: &str) -> (Orderbook, Trades) {
    let (events, expected) = parse_script(input).expect("script must parse");

    let book = Orderbook::new();
    let mut trades = Trades::new();

    for event in events {
        match event {
            Event::Add {
                order_type,
                side,
                price,
                quantity,
                id,
            } => trades.extend(book.add_order(Order::new(order_type, id, side, price, quantity))),
            Event::Modify {
                id,
                side,
                price,
                quantity,
            } => trades.extend(book.modify_order(OrderModify::new(id, side, price, quantity))),
            Event::Cancel { id } => book.cancel_order(id),
        }
    }

    let infos = book.level_infos();
    assert_eq!(book.size(), expected.total, "total live orders");
    assert_eq!(infos.bids().len(), expected.bids, "bid level count");
    assert_eq!(infos.asks().len(), expected.asks, "ask level count");

    (book, trades)
}

#[test]
fn good_till_cancel_match() {
    let (_, trades) = replay(include_str!("data/match_good_till_cancel.txt"));

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity(), 6);
    assert_eq!(trades[0].bid().price, 100);
    assert_eq!(trades[0].ask().price, 100);
}

#[test]
fn fill_and_kill_partial() {
    let (book, trades) = replay(include_str!("data/match_fill_and_kill.txt"));

    // 5 trade, the 3 remaining on the aggressor are cancelled.
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity(), 5);
    assert!(book.level_infos().asks().is_empty());
}

#[test]
fn fill_or_kill_hit() {
    let (book, trades) = replay(include_str!("data/match_fill_or_kill_hit.txt"));

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].quantity(), 10);
    assert_eq!(trades[0].bid().price, 100);
    assert_eq!(trades[1].quantity(), 2);
    assert_eq!(trades[1].bid().price, 99);

    // Bid 2 keeps 3 at 99.
    let infos = book.level_infos();
    assert_eq!(infos.bids()[0].price, 99);
    assert_eq!(infos.bids()[0].quantity, 3);
}

#[test]
fn fill_or_kill_miss() {
    let (book, trades) = replay(include_str!("data/match_fill_or_kill_miss.txt"));

    assert!(trades.is_empty());
    assert_eq!(book.level_infos().bids()[0].quantity, 10);
}

#[test]
fn cancel_success() {
    let (_, trades) = replay(include_str!("data/cancel_success.txt"));
    assert!(trades.is_empty());
}

#[test]
fn modify_side_flip() {
    let (book, trades) = replay(include_str!("data/modify_side.txt"));

    // Order 1 flips to the sell side and trades 5 against the 101 bid;
    // its remaining 5 rest as an ask.
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity(), 5);
    assert_eq!(trades[0].bid().order_id, 2);
    assert_eq!(trades[0].ask().order_id, 1);
    assert_eq!(book.level_infos().asks()[0].quantity, 5);
}

#[test]
fn market_consumes_best_first() {
    let (book, trades) = replay(include_str!("data/match_market.txt"));

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].ask().price, 101);
    assert_eq!(trades[0].quantity(), 4);
    assert_eq!(trades[1].ask().price, 102);
    assert_eq!(trades[1].quantity(), 3);

    assert_eq!(book.level_infos().asks()[0].quantity, 3);
}

#[test]
fn invalid_order_line_is_rejected() {
    let err = parse_script(include_str!("data/invalid_order_line.txt")).unwrap_err();
    assert!(matches!(err, ParseError::UnknownPrefix { line: 2, .. }));
}

#[test]
fn misplaced_result_line_is_rejected() {
    let err = parse_script(include_str!("data/wrong_line_result.txt")).unwrap_err();
    assert!(matches!(err, ParseError::ResultNotAtEnd { line: 3 }));
}
