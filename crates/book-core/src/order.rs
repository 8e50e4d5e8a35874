//! Order state as tracked inside the book.
//!
//! An [`Order`] is constructed by the caller and owned by the book from
//! admission until it is fully filled or cancelled. Remaining quantity
//! only ever decreases; the price and type change only through the
//! market-order promotion performed on admission.

use crate::order_type::OrderType;
use crate::side::Side;
use crate::{OrderId, Price, Quantity};

/// A single live order.
#[derive(Debug, Clone)]
pub struct Order {
    order_type: OrderType,
    id: OrderId,
    side: Side,
    price: Price,
    initial_quantity: Quantity,
    remaining_quantity: Quantity,
}

impl Order {
    /// Construct an order with an explicit limit price.
    ///
    /// # Panics
    ///
    /// Panics if `quantity` is zero; a zero-quantity order can never rest
    /// or trade.
    pub fn new(
        order_type: OrderType,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        assert!(quantity > 0, "order {id} must have a non-zero quantity");
        Order {
            order_type,
            id,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    /// Construct a market order. The price is a placeholder until the book
    /// re-prices the order on admission.
    pub fn market(id: OrderId, side: Side, quantity: Quantity) -> Self {
        Order::new(OrderType::Market, id, side, 0, quantity)
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    /// Returns `true` once the order has no remaining quantity.
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Fill the order by exactly `quantity` units.
    ///
    /// # Panics
    ///
    /// Panics if `quantity` exceeds the remaining quantity. The matching
    /// loop always fills by the minimum of both remainders, so exceeding
    /// it is a bug in the caller.
    pub fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "order {} cannot be filled for more than its remaining quantity",
            self.id
        );
        self.remaining_quantity -= quantity;
    }

    /// Re-price a market order and promote it to GoodTillCancel.
    ///
    /// # Panics
    ///
    /// Panics if the order is not a market order; only market orders may
    /// have their price adjusted.
    pub(crate) fn to_good_till_cancel(&mut self, price: Price) {
        assert!(
            self.order_type == OrderType::Market,
            "order {} cannot have its price adjusted, only market orders can",
            self.id
        );
        self.price = price;
        self.order_type = OrderType::GoodTillCancel;
    }
}

/// A requested replacement of an existing order's side, price and quantity.
///
/// Applied by cancelling the existing order and re-adding a fresh one under
/// the same id, keeping the existing order's type.
#[derive(Debug, Clone, Copy)]
pub struct OrderModify {
    order_id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
}

impl OrderModify {
    pub fn new(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        OrderModify {
            order_id,
            side,
            price,
            quantity,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Build the replacement order carrying the original order's type.
    pub fn to_order(&self, order_type: OrderType) -> Order {
        Order::new(
            order_type,
            self.order_id,
            self.side,
            self.price,
            self.quantity,
        )
    }
}
