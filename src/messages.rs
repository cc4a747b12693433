//! Inter-stage message types: requests flowing Ingress → Matcher on InQ, and
//! response events flowing Matcher → Egress on OutQ.
//!
//! Both are closed sum types by design: a fixed, small set of variants,
//! represented as tagged enums rather than via trait objects.

use crate::core_types::{Price, Qty, UserId, UserOrderId};
use crate::models::{Side, Symbol};

#[derive(Debug, Clone)]
pub enum Request {
    NewOrder(NewOrderRequest),
    Cancel(CancelRequest),
    Flush,
}

#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub price: Price,
    pub qty: Qty,
    pub side: Side,
    pub user_order_id: UserOrderId,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub user_id: UserId,
    pub user_order_id: UserOrderId,
}

#[derive(Debug, Clone)]
pub enum ResponseEvent {
    Ack {
        user_id: UserId,
        user_order_id: UserOrderId,
        symbol: Symbol,
    },
    Trade {
        buy_user_id: UserId,
        buy_user_order_id: UserOrderId,
        sell_user_id: UserId,
        sell_user_order_id: UserOrderId,
        price: Price,
        qty: Qty,
        symbol: Symbol,
    },
    /// Top-of-book change, or elimination when `level` is `None`.
    TopOfBook {
        side: Side,
        level: Option<(Price, Qty)>,
        symbol: Symbol,
    },
    CancelAck {
        user_id: UserId,
        user_order_id: UserOrderId,
        symbol: Symbol,
    },
}
