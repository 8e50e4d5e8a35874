//! Trade records produced by the matching loop.

use crate::{OrderId, Price, Quantity};

/// One side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeInfo {
    /// Identifier of the order on this side.
    pub order_id: OrderId,
    /// The resting order's price on this side.
    pub price: Price,
    /// Matched volume, shared by both sides.
    pub quantity: Quantity,
}

/// An executed trade between a resting bid and a resting ask.
///
/// Each side carries its own order's price; the aggressor's limit is not
/// printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    bid: TradeInfo,
    ask: TradeInfo,
}

impl Trade {
    pub fn new(bid: TradeInfo, ask: TradeInfo) -> Self {
        Trade { bid, ask }
    }

    /// Bid-side details of the trade.
    pub fn bid(&self) -> &TradeInfo {
        &self.bid
    }

    /// Ask-side details of the trade.
    pub fn ask(&self) -> &TradeInfo {
        &self.ask
    }

    /// Matched volume.
    pub fn quantity(&self) -> Quantity {
        self.bid.quantity
    }
}

/// Trades emitted by a single engine operation.
pub type Trades = Vec<Trade>;
