//! Order lifetime classification.

/// How long an order lives in the book and under what conditions it is
/// admitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderType {
    /// Rests until filled or cancelled.
    GoodTillCancel,

    /// Immediate-or-cancel: admitted only if at least one opposite level
    /// can trade; any remainder after matching is cancelled.
    FillAndKill,

    /// Admitted only if the opposite side can cover the full quantity at
    /// or within the limit; otherwise rejected outright.
    FillOrKill,

    /// Rests like GoodTillCancel but is cancelled at the daily cutoff.
    GoodForDay,

    /// No limit of its own; re-priced on admission to the worst opposite
    /// level and promoted to GoodTillCancel for the remainder of the match.
    Market,
}
