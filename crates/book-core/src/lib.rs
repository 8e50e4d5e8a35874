//! book-core
//!
//! Price–time priority limit order book for a single instrument:
//! - domain types (side, order lifetime, trades, level views)
//! - order representation
//! - the order book with its matching engine
//! - background pruning of good-for-day orders at the daily cutoff

pub mod side;
pub mod order_type;
pub mod order;
pub mod trade;
pub mod level_info;
pub mod order_book;
pub mod pruner;

pub use side::Side;
pub use order_type::OrderType;

pub use order::{Order, OrderModify};
pub use trade::{Trade, TradeInfo, Trades};
pub use level_info::{LevelInfo, LevelInfos, OrderbookLevelInfos};
pub use order_book::Orderbook;

/// Client-assigned order identifier, unique across the live set.
pub type OrderId = u64;

/// Limit price in exchange ticks.
pub type Price = i32;

/// Order size in units.
pub type Quantity = u32;
