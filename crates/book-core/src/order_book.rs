//! Single-instrument order book with price-time priority.
//!
//! Two coupled indices are kept in lock-step under one coarse lock:
//!
//! - `bids` / `asks`: `BTreeMap<Price, Level>`, each level a FIFO queue of
//!   orders at that price. Best bid is the highest key, best ask the
//!   lowest; both sides use the map's natural ascending order and are
//!   traversed from the appropriate end.
//! - `orders`: `OrderId` → arena slot. The slot is a stable handle into
//!   the order arena; each level threads an intrusive doubly-linked list
//!   through its slots, so removal by handle is O(1) and never moves
//!   another order.
//!
//! A third structure, `level_data`, aggregates `(count, quantity)` per
//! price across both sides and is maintained incrementally; fill-or-kill
//! admission walks it instead of the order queues.
//!
//! All public operations go through [`Orderbook`], which serialises them
//! on a single mutex shared with the good-for-day pruner thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use chrono::NaiveTime;
use tracing::{debug, trace};

use crate::level_info::{LevelInfo, OrderbookLevelInfos};
use crate::order::{Order, OrderModify};
use crate::order_type::OrderType;
use crate::pruner;
use crate::side::Side;
use crate::trade::{Trade, TradeInfo, Trades};
use crate::{OrderId, Price, Quantity};

/// Stable index of an order's slot in the arena.
type Slot = usize;

struct OrderNode {
    order: Order,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// Slot arena for live orders. Slots stay valid until the order they hold
/// is removed, so they double as the queue-position handles stored in the
/// id index.
struct OrderArena {
    nodes: Vec<Option<OrderNode>>,
    free: Vec<Slot>,
}

impl OrderArena {
    fn new() -> Self {
        OrderArena {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, order: Order) -> Slot {
        let node = OrderNode {
            order,
            prev: None,
            next: None,
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Some(node);
            slot
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn remove(&mut self, slot: Slot) -> Order {
        let node = self.nodes[slot].take().expect("arena slot already vacant");
        self.free.push(slot);
        node.order
    }

    fn get(&self, slot: Slot) -> &OrderNode {
        self.nodes[slot].as_ref().expect("arena slot is vacant")
    }

    fn get_mut(&mut self, slot: Slot) -> &mut OrderNode {
        self.nodes[slot].as_mut().expect("arena slot is vacant")
    }
}

/// One price level: an intrusive FIFO list threaded through arena slots.
#[derive(Default)]
struct Level {
    head: Option<Slot>,
    tail: Option<Slot>,
}

impl Level {
    fn front(&self) -> Option<Slot> {
        self.head
    }

    fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn push_back(&mut self, arena: &mut OrderArena, slot: Slot) {
        match self.tail {
            Some(tail) => {
                arena.get_mut(tail).next = Some(slot);
                arena.get_mut(slot).prev = Some(tail);
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn unlink(&mut self, arena: &mut OrderArena, slot: Slot) {
        let (prev, next) = {
            let node = arena.get(slot);
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => arena.get_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => arena.get_mut(next).prev = prev,
            None => self.tail = prev,
        }
        let node = arena.get_mut(slot);
        node.prev = None;
        node.next = None;
    }
}

/// Per-price aggregate across both sides: order count and summed remaining
/// quantity. Rows are erased when the count reaches zero.
#[derive(Debug, Default, Clone, Copy)]
struct LevelData {
    count: u32,
    quantity: Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelAction {
    Add,
    Remove,
    Match,
}

/// All mutable book state; lives behind the shared mutex.
pub(crate) struct BookState {
    arena: OrderArena,
    bids: BTreeMap<Price, Level>,
    asks: BTreeMap<Price, Level>,
    orders: HashMap<OrderId, Slot>,
    level_data: BTreeMap<Price, LevelData>,
}

impl BookState {
    fn new() -> Self {
        BookState {
            arena: OrderArena::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
            level_data: BTreeMap::new(),
        }
    }

    fn add_order(&mut self, mut order: Order) -> Trades {
        if self.orders.contains_key(&order.id()) {
            debug!(order_id = order.id(), "duplicate order id, ignoring");
            return Trades::new();
        }

        // Market orders are re-priced to the worst opposite level so they
        // consume from the best price inward; with no opposite side they
        // are rejected.
        if order.order_type() == OrderType::Market {
            match order.side() {
                Side::Buy => match self.asks.keys().next_back().copied() {
                    Some(worst_ask) => order.to_good_till_cancel(worst_ask),
                    None => return Trades::new(),
                },
                Side::Sell => match self.bids.keys().next().copied() {
                    Some(worst_bid) => order.to_good_till_cancel(worst_bid),
                    None => return Trades::new(),
                },
            }
        }

        if order.order_type() == OrderType::FillAndKill
            && !self.can_match(order.side(), order.price())
        {
            debug!(order_id = order.id(), "fill-and-kill cannot match, rejecting");
            return Trades::new();
        }

        if order.order_type() == OrderType::FillOrKill
            && !self.can_fully_fill(order.side(), order.price(), order.initial_quantity())
        {
            debug!(order_id = order.id(), "fill-or-kill cannot be covered, rejecting");
            return Trades::new();
        }

        let id = order.id();
        let side = order.side();
        let price = order.price();
        let initial_quantity = order.initial_quantity();
        let order_type = order.order_type();

        let slot = self.arena.insert(order);
        let level = match side {
            Side::Buy => self.bids.entry(price).or_default(),
            Side::Sell => self.asks.entry(price).or_default(),
        };
        level.push_back(&mut self.arena, slot);
        self.orders.insert(id, slot);
        self.on_order_added(price, initial_quantity);
        trace!(order_id = id, ?side, price, quantity = initial_quantity, "order added");

        let trades = self.match_orders();

        // A fill-and-kill order must never leave a resting remainder; the
        // id is known, so cancel it directly rather than peeking at the
        // front of its side.
        if order_type == OrderType::FillAndKill && self.orders.contains_key(&id) {
            self.cancel_order(id);
        }

        trades
    }

    pub(crate) fn cancel_order(&mut self, order_id: OrderId) {
        let Some(slot) = self.orders.remove(&order_id) else {
            return;
        };

        let (side, price) = {
            let order = &self.arena.get(slot).order;
            (order.side(), order.price())
        };

        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = levels
            .get_mut(&price)
            .expect("resting order has no price level");
        level.unlink(&mut self.arena, slot);
        if level.is_empty() {
            levels.remove(&price);
        }

        let order = self.arena.remove(slot);
        self.on_order_cancelled(price, order.remaining_quantity());
        trace!(order_id, ?side, price, "order cancelled");
    }

    fn modify_order(&mut self, modification: OrderModify) -> Trades {
        let Some(&slot) = self.orders.get(&modification.order_id()) else {
            return Trades::new();
        };
        let order_type = self.arena.get(slot).order.order_type();

        self.cancel_order(modification.order_id());
        self.add_order(modification.to_order(order_type))
    }

    fn size(&self) -> usize {
        self.orders.len()
    }

    fn level_infos(&self) -> OrderbookLevelInfos {
        let mut bid_infos = Vec::with_capacity(self.bids.len());
        for (&price, level) in self.bids.iter().rev() {
            bid_infos.push(LevelInfo {
                price,
                quantity: self.level_quantity(level),
            });
        }

        let mut ask_infos = Vec::with_capacity(self.asks.len());
        for (&price, level) in self.asks.iter() {
            ask_infos.push(LevelInfo {
                price,
                quantity: self.level_quantity(level),
            });
        }

        OrderbookLevelInfos::new(bid_infos, ask_infos)
    }

    fn level_quantity(&self, level: &Level) -> Quantity {
        let mut total = 0;
        let mut cursor = level.front();
        while let Some(slot) = cursor {
            let node = self.arena.get(slot);
            total += node.order.remaining_quantity();
            cursor = node.next;
        }
        total
    }

    /// Ids of every resting good-for-day order, collected for the pruner.
    pub(crate) fn day_order_ids(&self) -> Vec<OrderId> {
        self.orders
            .iter()
            .filter(|(_, &slot)| {
                self.arena.get(slot).order.order_type() == OrderType::GoodForDay
            })
            .map(|(&id, _)| id)
            .collect()
    }

    fn can_match(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self
                .asks
                .keys()
                .next()
                .is_some_and(|&best_ask| price >= best_ask),
            Side::Sell => self
                .bids
                .keys()
                .next_back()
                .is_some_and(|&best_bid| price <= best_bid),
        }
    }

    /// Fill-or-kill admission: walk the per-price aggregate in key order,
    /// counting only levels on or beyond the best opposite price and on or
    /// within the submitter's limit, until the quantity is covered.
    fn can_fully_fill(&self, side: Side, price: Price, mut quantity: Quantity) -> bool {
        if !self.can_match(side, price) {
            return false;
        }

        let threshold = match side {
            Side::Buy => *self.asks.keys().next().expect("can_match implies a best ask"),
            Side::Sell => *self
                .bids
                .keys()
                .next_back()
                .expect("can_match implies a best bid"),
        };

        for (&level_price, data) in &self.level_data {
            let outside_threshold = match side {
                Side::Buy => level_price < threshold,
                Side::Sell => level_price > threshold,
            };
            let outside_limit = match side {
                Side::Buy => level_price > price,
                Side::Sell => level_price < price,
            };
            if outside_threshold || outside_limit {
                continue;
            }

            if quantity <= data.quantity {
                return true;
            }
            quantity -= data.quantity;
        }

        false
    }

    /// Run the matching loop until top-of-book no longer crosses.
    fn match_orders(&mut self) -> Trades {
        let mut trades = Trades::with_capacity(self.orders.len());

        loop {
            let Some(bid_price) = self.bids.keys().next_back().copied() else {
                break;
            };
            let Some(ask_price) = self.asks.keys().next().copied() else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            loop {
                let Some(bid_slot) = self.bids.get(&bid_price).and_then(Level::front) else {
                    break;
                };
                let Some(ask_slot) = self.asks.get(&ask_price).and_then(Level::front) else {
                    break;
                };

                let quantity = {
                    let bid = &self.arena.get(bid_slot).order;
                    let ask = &self.arena.get(ask_slot).order;
                    bid.remaining_quantity().min(ask.remaining_quantity())
                };

                self.arena.get_mut(bid_slot).order.fill(quantity);
                self.arena.get_mut(ask_slot).order.fill(quantity);

                let (bid_id, bid_filled) = {
                    let order = &self.arena.get(bid_slot).order;
                    (order.id(), order.is_filled())
                };
                let (ask_id, ask_filled) = {
                    let order = &self.arena.get(ask_slot).order;
                    (order.id(), order.is_filled())
                };

                if bid_filled {
                    let level = self
                        .bids
                        .get_mut(&bid_price)
                        .expect("matched bid has no price level");
                    level.unlink(&mut self.arena, bid_slot);
                    self.arena.remove(bid_slot);
                    self.orders.remove(&bid_id);
                }
                if ask_filled {
                    let level = self
                        .asks
                        .get_mut(&ask_price)
                        .expect("matched ask has no price level");
                    level.unlink(&mut self.arena, ask_slot);
                    self.arena.remove(ask_slot);
                    self.orders.remove(&ask_id);
                }

                // Trade prices come from the resting side each order rests
                // at; the aggressor's limit is not printed.
                trades.push(Trade::new(
                    TradeInfo {
                        order_id: bid_id,
                        price: bid_price,
                        quantity,
                    },
                    TradeInfo {
                        order_id: ask_id,
                        price: ask_price,
                        quantity,
                    },
                ));
                debug!(bid_id, ask_id, bid_price, ask_price, quantity, "trade");

                self.on_order_matched(bid_price, quantity, bid_filled);
                self.on_order_matched(ask_price, quantity, ask_filled);
            }

            // Emptied queues are erased eagerly. Their aggregate rows are
            // not: both sides can transiently rest at one price, and the
            // per-fill updates above already retire rows whose count hit
            // zero.
            if self.bids.get(&bid_price).is_some_and(Level::is_empty) {
                self.bids.remove(&bid_price);
            }
            if self.asks.get(&ask_price).is_some_and(Level::is_empty) {
                self.asks.remove(&ask_price);
            }
        }

        trades
    }

    fn on_order_added(&mut self, price: Price, initial_quantity: Quantity) {
        self.update_level_data(price, initial_quantity, LevelAction::Add);
    }

    fn on_order_cancelled(&mut self, price: Price, remaining_quantity: Quantity) {
        self.update_level_data(price, remaining_quantity, LevelAction::Remove);
    }

    fn on_order_matched(&mut self, price: Price, quantity: Quantity, fully_filled: bool) {
        let action = if fully_filled {
            LevelAction::Remove
        } else {
            LevelAction::Match
        };
        self.update_level_data(price, quantity, action);
    }

    fn update_level_data(&mut self, price: Price, quantity: Quantity, action: LevelAction) {
        let data = self.level_data.entry(price).or_default();
        match action {
            LevelAction::Add => {
                data.count += 1;
                data.quantity += quantity;
            }
            LevelAction::Remove => {
                data.count -= 1;
                data.quantity -= quantity;
            }
            LevelAction::Match => {
                data.quantity -= quantity;
            }
        }
        if data.count == 0 {
            self.level_data.remove(&price);
        }
    }
}

/// State shared between the public handle and the pruner thread.
pub(crate) struct Shared {
    pub(crate) state: Mutex<BookState>,
    pub(crate) shutdown: AtomicBool,
    pub(crate) shutdown_signal: Condvar,
}

/// Thread-safe order book for a single instrument.
///
/// Every operation takes the book lock for its full duration; concurrent
/// callers serialise. A background worker shares the lock and cancels
/// good-for-day orders at the daily cutoff. Dropping the book signals the
/// worker and joins it.
pub struct Orderbook {
    shared: Arc<Shared>,
    prune_worker: Option<JoinHandle<()>>,
}

impl Orderbook {
    /// Create a book whose day orders are pruned at the default 16:00
    /// local cutoff.
    pub fn new() -> Self {
        Self::with_cutoff(pruner::default_cutoff())
    }

    /// Create a book with an explicit daily cutoff for good-for-day
    /// orders.
    pub fn with_cutoff(cutoff: NaiveTime) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(BookState::new()),
            shutdown: AtomicBool::new(false),
            shutdown_signal: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || pruner::run(&shared, cutoff))
        };

        Orderbook {
            shared,
            prune_worker: Some(worker),
        }
    }

    /// Add an order, returning the trades produced by matching it.
    ///
    /// Duplicate ids, market orders with no opposite side, unmatched
    /// fill-and-kill orders and uncovered fill-or-kill orders are rejected
    /// with an empty trade list and leave the book unchanged.
    pub fn add_order(&self, order: Order) -> Trades {
        self.lock_state().add_order(order)
    }

    /// Cancel an order by id. Unknown ids are a silent no-op.
    pub fn cancel_order(&self, order_id: OrderId) {
        self.lock_state().cancel_order(order_id);
    }

    /// Cancel a batch of orders under a single lock acquisition.
    pub fn cancel_orders(&self, order_ids: &[OrderId]) {
        let mut state = self.lock_state();
        for &order_id in order_ids {
            state.cancel_order(order_id);
        }
    }

    /// Replace an existing order's side, price and quantity, keeping its
    /// type. Unknown ids return no trades and leave the book unchanged.
    pub fn modify_order(&self, modification: OrderModify) -> Trades {
        self.lock_state().modify_order(modification)
    }

    /// Number of live orders.
    pub fn size(&self) -> usize {
        self.lock_state().size()
    }

    /// Aggregated per-price snapshot of both sides.
    pub fn level_infos(&self) -> OrderbookLevelInfos {
        self.lock_state().level_infos()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BookState> {
        self.shared.state.lock().unwrap()
    }
}

impl Default for Orderbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Orderbook {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, AtomicOrdering::Release);
        self.shared.shutdown_signal.notify_all();
        if let Some(worker) = self.prune_worker.take() {
            let _ = worker.join();
        }
    }
}
