//! OrderBook - sorted-vector price-time priority order book.
//!
//! # Key design
//!
//! Each side's ladder is a `Vec<PriceLevel>` kept sorted by price (bids
//! descending, asks ascending - index 0 is always the best price), not a
//! `BTreeMap`. At the order-count this engine expects per symbol (on the
//! order of 100-150 resting price levels) a contiguous sorted array with
//! binary search beats a tree: O(log P) lookup, O(P) insert/shift, but no
//! pointer chasing and excellent cache behavior for the match loop, which
//! only ever touches the front of the ladder.
//!
//! # Complexity
//! | Operation | Time |
//! |-----------|------|
//! | Best price | O(1) |
//! | Insert new level | O(log P) search + O(P) shift |
//! | Cancel by key | O(1) index lookup + O(log P) level lookup + O(k) unlink |

use crate::core_types::{Price, Qty, SeqNum};
use crate::messages::ResponseEvent;
use crate::models::{Order, OrderHandle, OrderType, ParticipantKey, Side};
use rustc_hash::FxHashMap;

/// A single price level: all resting orders sharing one price on one side,
/// in FIFO arrival order. A level exists iff `orders` is non-empty.
#[derive(Debug)]
struct PriceLevel {
    price: Price,
    orders: std::collections::VecDeque<Order>,
    total_qty: Qty,
}

impl PriceLevel {
    fn new(price: Price) -> Self {
        Self { price, orders: std::collections::VecDeque::new(), total_qty: 0 }
    }
}

/// Last emitted `(price, total_qty)` per side, for top-of-book change
/// detection. `None` means the side was last reported empty.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TopSnapshot(Option<(Price, Qty)>);

#[derive(Debug)]
pub struct OrderBook {
    bids: Vec<PriceLevel>, // sorted descending by price; index 0 = best
    asks: Vec<PriceLevel>, // sorted ascending by price; index 0 = best
    order_index: FxHashMap<ParticipantKey, OrderHandle>,
    prev_bid_top: TopSnapshot,
    prev_ask_top: TopSnapshot,
    next_seq: SeqNum,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            order_index: FxHashMap::default(),
            prev_bid_top: TopSnapshot::default(),
            prev_ask_top: TopSnapshot::default(),
            next_seq: 0,
        }
    }

    fn ladder(&self, side: Side) -> &Vec<PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn ladder_mut(&mut self, side: Side) -> &mut Vec<PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Borrows the requested side's ladder and the order index at the same
    /// time as two disjoint fields, so callers can unlink an order from a
    /// level and update the index without two overlapping `&mut self`
    /// borrows.
    fn ladder_and_index_mut(
        &mut self,
        side: Side,
    ) -> (&mut Vec<PriceLevel>, &mut FxHashMap<ParticipantKey, OrderHandle>) {
        match side {
            Side::Buy => (&mut self.bids, &mut self.order_index),
            Side::Sell => (&mut self.asks, &mut self.order_index),
        }
    }

    /// Finds the index of `price`'s level in `side`'s ladder, honoring each
    /// side's sort direction (bids descending, asks ascending).
    fn find_level_index(&self, side: Side, price: Price) -> Result<usize, usize> {
        Self::find_level_index_in(self.ladder(side), side, price)
    }

    fn find_level_index_in(ladder: &[PriceLevel], side: Side, price: Price) -> Result<usize, usize> {
        match side {
            Side::Buy => ladder.binary_search_by(|lvl| lvl.price.cmp(&price).reverse()),
            Side::Sell => ladder.binary_search_by(|lvl| lvl.price.cmp(&price)),
        }
    }

    fn best_level(&self, side: Side) -> Option<&PriceLevel> {
        self.ladder(side).first()
    }

    fn top_of(&self, side: Side) -> Option<(Price, Qty)> {
        self.best_level(side).map(|l| (l.price, l.total_qty))
    }

    /// Processes a new order end to end: ACK, match loop, rest, top-of-book
    /// check. Events are appended to `out` in emission order.
    ///
    /// A new order whose `(user_id, user_order_id)` duplicates an already
    /// resting order is accepted as an independent order. If it also ends up
    /// resting, `rest()` keeps the existing index entry rather than
    /// overwriting it - the older mapping wins, matching the source's
    /// documented behavior. The newer order still occupies book state and
    /// can still be matched against; it is just not reachable by cancel
    /// under that key while the older one rests.
    pub fn add_order(
        &mut self,
        user_id: crate::core_types::UserId,
        user_order_id: crate::core_types::UserOrderId,
        symbol: crate::models::Symbol,
        price: Price,
        qty: Qty,
        side: Side,
        out: &mut Vec<ResponseEvent>,
    ) {
        out.push(ResponseEvent::Ack { user_id, user_order_id, symbol });

        let order_type = crate::models::order_type_for_price(price);
        let seq = self.next_seq;
        self.next_seq += 1;
        let mut order = Order {
            user_id,
            user_order_id,
            symbol,
            price,
            remaining_qty: qty,
            side,
            order_type,
            seq,
        };

        self.match_against_opposite(&mut order, out);

        if order.remaining_qty > 0 && order.order_type == OrderType::Limit {
            self.rest(order);
        }
        // Market-order residuals are discarded here: falling out of this
        // function without resting is the whole implementation of that rule.

        self.emit_top_of_book_changes(symbol, out);
    }

    fn match_against_opposite(&mut self, order: &mut Order, out: &mut Vec<ResponseEvent>) {
        let opp_side = order.side.opposite();

        while order.remaining_qty > 0 {
            let can_cross = match self.best_level(opp_side) {
                None => false,
                Some(level) => match order.order_type {
                    OrderType::Market => true,
                    OrderType::Limit => match order.side {
                        Side::Buy => order.price >= level.price,
                        Side::Sell => order.price <= level.price,
                    },
                },
            };
            if !can_cross {
                break;
            }

            let level_price = self.ladder(opp_side)[0].price;
            let mut level_emptied = false;

            {
                let (ladder, order_index) = self.ladder_and_index_mut(opp_side);
                let level = &mut ladder[0];
                while order.remaining_qty > 0 {
                    let Some(resting) = level.orders.front_mut() else { break };
                    let match_qty = order.remaining_qty.min(resting.remaining_qty);

                    let (buy_uid, buy_uoid, sell_uid, sell_uoid) = match order.side {
                        Side::Buy => (
                            order.user_id,
                            order.user_order_id,
                            resting.user_id,
                            resting.user_order_id,
                        ),
                        Side::Sell => (
                            resting.user_id,
                            resting.user_order_id,
                            order.user_id,
                            order.user_order_id,
                        ),
                    };
                    out.push(ResponseEvent::Trade {
                        buy_user_id: buy_uid,
                        buy_user_order_id: buy_uoid,
                        sell_user_id: sell_uid,
                        sell_user_order_id: sell_uoid,
                        price: level_price,
                        qty: match_qty,
                        symbol: order.symbol,
                    });

                    order.remaining_qty -= match_qty;
                    resting.remaining_qty -= match_qty;
                    level.total_qty -= match_qty;

                    if resting.remaining_qty == 0 {
                        let filled = level.orders.pop_front().unwrap();
                        order_index.remove(&filled.participant_key());
                    }
                }
                if level.orders.is_empty() {
                    level_emptied = true;
                }
            }

            if level_emptied {
                self.ladder_mut(opp_side).remove(0);
            }
        }
    }

    fn rest(&mut self, order: Order) {
        let side = order.side;
        let price = order.price;
        let idx = match self.find_level_index(side, price) {
            Ok(idx) => idx,
            Err(insert_at) => {
                self.ladder_mut(side).insert(insert_at, PriceLevel::new(price));
                insert_at
            }
        };
        let key = order.participant_key();
        let level = &mut self.ladder_mut(side)[idx];
        level.total_qty += order.remaining_qty;
        level.orders.push_back(order);
        // Matches the documented original behavior (spec Sec 9 open
        // question): if a resting order already owns this key, its mapping
        // is retained and the new order rests unindexed-but-present in the
        // book rather than clobbering the older handle.
        self.order_index.entry(key).or_insert(OrderHandle { side, price });
    }

    /// Looks up the order by key, unlinks it from its price level (dropping
    /// the level if it becomes empty), and always emits a Cancel-Ack
    /// followed by a top-of-book check. An unknown key still gets a
    /// Cancel-Ack - this is a design commitment for client observability,
    /// not an error.
    pub fn cancel_order(
        &mut self,
        user_id: crate::core_types::UserId,
        user_order_id: crate::core_types::UserOrderId,
        symbol: crate::models::Symbol,
        out: &mut Vec<ResponseEvent>,
    ) {
        let key = (user_id, user_order_id);
        if let Some(handle) = self.order_index.remove(&key) {
            if let Ok(idx) = self.find_level_index(handle.side, handle.price) {
                let ladder = self.ladder_mut(handle.side);
                let level = &mut ladder[idx];
                if let Some(pos) = level.orders.iter().position(|o| o.participant_key() == key) {
                    let removed = level.orders.remove(pos).unwrap();
                    level.total_qty -= removed.remaining_qty;
                }
                if level.orders.is_empty() {
                    ladder.remove(idx);
                }
            }
        }

        out.push(ResponseEvent::CancelAck { user_id, user_order_id, symbol });

        // Spec §9: TOB-check on an unknown key is a guaranteed no-op since
        // nothing changed; still run it so present-order cancellation and
        // absent-order cancellation share one code path.
        self.emit_top_of_book_changes(symbol, out);
    }

    fn emit_top_of_book_changes(&mut self, symbol: crate::models::Symbol, out: &mut Vec<ResponseEvent>) {
        let new_bid = TopSnapshot(self.top_of(Side::Buy));
        if new_bid != self.prev_bid_top {
            out.push(ResponseEvent::TopOfBook { side: Side::Buy, level: new_bid.0, symbol });
            self.prev_bid_top = new_bid;
        }
        let new_ask = TopSnapshot(self.top_of(Side::Sell));
        if new_ask != self.prev_ask_top {
            out.push(ResponseEvent::TopOfBook { side: Side::Sell, level: new_ask.0, symbol });
            self.prev_ask_top = new_ask;
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Symbol;

    fn sym() -> Symbol {
        Symbol::parse("IBM").unwrap()
    }

    fn new_order(
        book: &mut OrderBook,
        uid: u32,
        price: u32,
        qty: u32,
        side: Side,
        uoid: u32,
    ) -> Vec<ResponseEvent> {
        let mut out = Vec::new();
        book.add_order(uid, uoid, sym(), price, qty, side, &mut out);
        out
    }

    #[test]
    fn resting_order_becomes_best_of_its_side() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 10, Side::Buy, 1);
        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn simple_cross_produces_ack_tob_ack_trade_elimination() {
        let mut book = OrderBook::new();
        let ev1 = new_order(&mut book, 1, 100, 50, Side::Sell, 1);
        assert!(matches!(ev1[0], ResponseEvent::Ack { .. }));
        assert!(matches!(
            ev1[1],
            ResponseEvent::TopOfBook { side: Side::Sell, level: Some((100, 50)), .. }
        ));

        let ev2 = new_order(&mut book, 2, 100, 50, Side::Buy, 2);
        assert!(matches!(ev2[0], ResponseEvent::Ack { .. }));
        assert!(matches!(ev2[1], ResponseEvent::Trade { qty: 50, price: 100, .. }));
        assert!(matches!(
            ev2[2],
            ResponseEvent::TopOfBook { side: Side::Sell, level: None, .. }
        ));
        assert_eq!(ev2.len(), 3);
        assert!(book.is_empty());
    }

    #[test]
    fn partial_fill_leaves_resting_residual() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 50, Side::Sell, 1);
        let ev = new_order(&mut book, 2, 100, 30, Side::Buy, 2);
        assert!(matches!(ev[1], ResponseEvent::Trade { qty: 30, .. }));
        assert!(matches!(
            ev[2],
            ResponseEvent::TopOfBook { side: Side::Sell, level: Some((100, 20)), .. }
        ));
        assert_eq!(book.best_ask(), Some(100));
    }

    #[test]
    fn time_priority_matches_oldest_resting_order_first() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 10, Side::Sell, 1);
        new_order(&mut book, 1, 100, 20, Side::Sell, 2);
        new_order(&mut book, 1, 100, 30, Side::Sell, 3);

        let ev = new_order(&mut book, 9, 0, 25, Side::Buy, 10);
        let trades: Vec<_> = ev
            .iter()
            .filter(|e| matches!(e, ResponseEvent::Trade { .. }))
            .collect();
        assert_eq!(trades.len(), 2);
        assert!(matches!(trades[0], ResponseEvent::Trade { qty: 10, sell_user_order_id: 1, .. }));
        assert!(matches!(trades[1], ResponseEvent::Trade { qty: 15, sell_user_order_id: 2, .. }));
    }

    #[test]
    fn market_order_residual_is_discarded_not_rested() {
        let mut book = OrderBook::new();
        let ev = new_order(&mut book, 9, 0, 10, Side::Buy, 1);
        assert!(matches!(ev[0], ResponseEvent::Ack { .. }));
        assert_eq!(ev.len(), 1); // no trade, no TOB change against an empty book
        assert!(book.is_empty());
    }

    #[test]
    fn cancel_of_sole_order_eliminates_top_of_book() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 50, Side::Buy, 1);
        let mut out = Vec::new();
        book.cancel_order(1, 1, sym(), &mut out);
        assert!(matches!(out[0], ResponseEvent::CancelAck { .. }));
        assert!(matches!(
            out[1],
            ResponseEvent::TopOfBook { side: Side::Buy, level: None, .. }
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn cancel_of_unknown_order_still_emits_cancel_ack() {
        let mut book = OrderBook::new();
        let mut out = Vec::new();
        book.cancel_order(42, 7, sym(), &mut out);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], ResponseEvent::CancelAck { .. }));
    }

    #[test]
    fn duplicate_key_resting_twice_keeps_older_index_entry() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 10, Side::Buy, 5);
        new_order(&mut book, 1, 101, 20, Side::Buy, 5);

        // The older order (price 100) must still be reachable by cancel.
        let mut out = Vec::new();
        book.cancel_order(1, 5, sym(), &mut out);
        assert!(matches!(out[0], ResponseEvent::CancelAck { .. }));

        // Both orders still occupy the book: price level 101 (qty 20) is
        // untouched, price level 100 (qty 10) was just cancelled.
        assert_eq!(book.best_bid(), Some(101));
    }

    #[test]
    fn crossing_multiple_levels_fills_best_price_first() {
        let mut book = OrderBook::new();
        new_order(&mut book, 1, 100, 10, Side::Sell, 1);
        new_order(&mut book, 1, 101, 10, Side::Sell, 2);

        let ev = new_order(&mut book, 9, 101, 20, Side::Buy, 3);
        let trades: Vec<_> = ev
            .iter()
            .filter_map(|e| match e {
                ResponseEvent::Trade { price, qty, .. } => Some((*price, *qty)),
                _ => None,
            })
            .collect();
        assert_eq!(trades, vec![(100, 10), (101, 10)]);
        assert!(book.is_empty());
    }
}
