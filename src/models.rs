//! Order, symbol, and participant types shared by the order book and engine.

use crate::core_types::{Price, Qty, SeqNum, UserId, UserOrderId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire representation used on both the input `side` field and the `B`/`S`
    /// tag of top-of-book output lines.
    pub fn as_wire_char(self) -> char {
        match self {
            Side::Buy => 'B',
            Side::Sell => 'S',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    /// `price == 0` on the wire. Matches at any price; never rests.
    Market,
    Limit,
}

/// Maximum length of a [`Symbol`] token, inline, no heap allocation per
/// order.
pub const SYMBOL_MAX_LEN: usize = 16;

/// Short ASCII token identifying a tradable instrument, stored inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("symbol exceeds {SYMBOL_MAX_LEN} bytes")]
pub struct SymbolTooLong;

impl Symbol {
    pub fn parse(s: &str) -> Result<Self, SymbolTooLong> {
        let s = s.as_bytes();
        if s.len() > SYMBOL_MAX_LEN {
            return Err(SymbolTooLong);
        }
        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..s.len()].copy_from_slice(s);
        Ok(Self { bytes, len: s.len() as u8 })
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: constructed only from a valid &str slice in `parse`.
        unsafe { std::str::from_utf8_unchecked(&self.bytes[..self.len as usize]) }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

/// Identifies a participant's order: unique per `(user_id, user_order_id)`
/// pair, not globally. Used as the order-index key and as the key of the
/// engine's global order→symbol map.
pub type ParticipantKey = (UserId, UserOrderId);

/// Locates a resting order's price level without re-deriving it from the
/// order itself; stored in the order index alongside the key.
#[derive(Debug, Clone, Copy)]
pub struct OrderHandle {
    pub side: Side,
    pub price: Price,
}

/// A live order: either in flight through the matcher or resting in a
/// price level's FIFO list.
#[derive(Debug, Clone)]
pub struct Order {
    pub user_id: UserId,
    pub user_order_id: UserOrderId,
    pub symbol: Symbol,
    pub price: Price,
    pub remaining_qty: Qty,
    pub side: Side,
    pub order_type: OrderType,
    /// Assigned at registration time; breaks ties at a shared price level.
    /// Never derived from wall-clock time.
    pub seq: SeqNum,
}

impl Order {
    pub fn participant_key(&self) -> ParticipantKey {
        (self.user_id, self.user_order_id)
    }
}

pub fn order_type_for_price(price: Price) -> OrderType {
    if price == 0 { OrderType::Market } else { OrderType::Limit }
}
