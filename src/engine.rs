//! MatchingEngine - routes requests to per-symbol order books.
//!
//! A single matching worker serializes order processing across all symbols
//! (no parallel matching). Order books are created lazily on first use of
//! a symbol.

use crate::messages::{CancelRequest, NewOrderRequest, ResponseEvent};
use crate::models::{ParticipantKey, Symbol};
use crate::orderbook::OrderBook;
use rustc_hash::FxHashMap;

pub struct MatchingEngine {
    books: FxHashMap<Symbol, OrderBook>,
    /// Cancel requests don't carry a symbol, so the engine tracks where each
    /// resting order lives globally.
    order_symbol: FxHashMap<ParticipantKey, Symbol>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self { books: FxHashMap::default(), order_symbol: FxHashMap::default() }
    }

    pub fn process_new_order(&mut self, req: &NewOrderRequest, out: &mut Vec<ResponseEvent>) {
        let key: ParticipantKey = (req.user_id, req.user_order_id);
        // A duplicate key is retained as-is (not an error at this layer) -
        // the older mapping stays until overwritten by whichever order next
        // rests under the same key.
        self.order_symbol.entry(key).or_insert(req.symbol);

        let book = self.books.entry(req.symbol).or_default();
        book.add_order(req.user_id, req.user_order_id, req.symbol, req.price, req.qty, req.side, out);
    }

    pub fn process_cancel(&mut self, req: &CancelRequest, out: &mut Vec<ResponseEvent>) {
        let key: ParticipantKey = (req.user_id, req.user_order_id);
        match self.order_symbol.remove(&key) {
            Some(symbol) => {
                if let Some(book) = self.books.get_mut(&symbol) {
                    book.cancel_order(req.user_id, req.user_order_id, symbol, out);
                }
            }
            None => {
                // Unknown key: still a Cancel-Ack, with no symbol to attach
                // top-of-book semantics to. The wire format requires a
                // symbol field, so the only one we have is the would-be
                // caller's convention; emit under a synthetic empty symbol.
                out.push(ResponseEvent::CancelAck {
                    user_id: req.user_id,
                    user_order_id: req.user_order_id,
                    symbol: Symbol::parse("").unwrap(),
                });
            }
        }
    }

    pub fn flush(&mut self) {
        self.books.clear();
        self.order_symbol.clear();
    }

    #[cfg(test)]
    pub fn book(&self, symbol: Symbol) -> Option<&OrderBook> {
        self.books.get(&symbol)
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn new_order(
        user_id: u32,
        symbol: Symbol,
        price: u32,
        qty: u32,
        side: Side,
        user_order_id: u32,
    ) -> NewOrderRequest {
        NewOrderRequest { user_id, symbol, price, qty, side, user_order_id }
    }

    #[test]
    fn cross_symbol_isolation_produces_no_trade() {
        let mut engine = MatchingEngine::new();
        let mut out = Vec::new();
        engine.process_new_order(&new_order(1, sym("IBM"), 100, 50, Side::Buy, 1), &mut out);
        engine.process_new_order(&new_order(2, sym("AAPL"), 100, 50, Side::Sell, 2), &mut out);

        assert!(!out.iter().any(|e| matches!(e, ResponseEvent::Trade { .. })));
        assert_eq!(engine.book(sym("IBM")).unwrap().best_bid(), Some(100));
        assert_eq!(engine.book(sym("AAPL")).unwrap().best_ask(), Some(100));
    }

    #[test]
    fn flush_clears_all_books_and_symbol_map() {
        let mut engine = MatchingEngine::new();
        let mut out = Vec::new();
        engine.process_new_order(&new_order(1, sym("IBM"), 100, 50, Side::Buy, 1), &mut out);
        engine.flush();
        assert!(engine.book(sym("IBM")).is_none());

        out.clear();
        engine.process_new_order(&new_order(1, sym("IBM"), 100, 50, Side::Buy, 3), &mut out);
        assert!(matches!(out[0], ResponseEvent::Ack { .. }));
        assert!(matches!(
            out[1],
            ResponseEvent::TopOfBook { level: Some((100, 50)), .. }
        ));
    }

    #[test]
    fn cancel_routes_through_global_symbol_map() {
        let mut engine = MatchingEngine::new();
        let mut out = Vec::new();
        engine.process_new_order(&new_order(1, sym("IBM"), 100, 50, Side::Buy, 1), &mut out);
        out.clear();
        engine.process_cancel(&CancelRequest { user_id: 1, user_order_id: 1 }, &mut out);
        assert!(matches!(out[0], ResponseEvent::CancelAck { .. }));
        assert!(engine.book(sym("IBM")).unwrap().is_empty());
    }

    #[test]
    fn cancel_of_unknown_key_still_acks() {
        let mut engine = MatchingEngine::new();
        let mut out = Vec::new();
        engine.process_cancel(&CancelRequest { user_id: 9, user_order_id: 9 }, &mut out);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], ResponseEvent::CancelAck { .. }));
    }
}
