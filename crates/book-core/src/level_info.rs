//! Aggregated per-price-level views of the book.

use crate::{Price, Quantity};

/// One price level: the price and the summed remaining quantity of every
/// order resting there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

pub type LevelInfos = Vec<LevelInfo>;

/// Snapshot of both sides of the book, bids from the highest price, asks
/// from the lowest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderbookLevelInfos {
    bids: LevelInfos,
    asks: LevelInfos,
}

impl OrderbookLevelInfos {
    pub fn new(bids: LevelInfos, asks: LevelInfos) -> Self {
        OrderbookLevelInfos { bids, asks }
    }

    pub fn bids(&self) -> &LevelInfos {
        &self.bids
    }

    pub fn asks(&self) -> &LevelInfos {
        &self.asks
    }
}
