//! Core scalar types used throughout the system
//!
//! These are fundamental type aliases. They provide semantic meaning and a
//! single place to widen precision later without touching every signature.

/// User ID - globally unique participant identifier, 32-bit per the wire
/// format (§3).
pub type UserId = u32;

/// User-assigned order ID - unique per user, not globally unique.
/// Combined with [`UserId`] as [`crate::models::ParticipantKey`].
pub type UserOrderId = u32;

/// Price and quantity are both non-negative 32-bit integers on the wire.
/// `price == 0` on a New Order denotes a market order (see
/// [`crate::models::OrderType`]).
pub type Price = u32;
pub type Qty = u32;

/// Monotonic arrival sequence number assigned by the matcher at
/// registration time. Used to break ties at a price level; never derived
/// from wall-clock time (see the rationale in `orderbook.rs`).
pub type SeqNum = u64;
