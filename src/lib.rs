//! fastbook - multi-symbol limit order matching engine
//!
//! Three long-lived workers linked by two bounded lock-free queues:
//!
//! ```text
//! [Ingress Parser] --InQ--> [Matcher] --OutQ--> [Egress Formatter]
//! ```
//!
//! # Modules
//!
//! - [`core_types`] - fundamental scalar aliases
//! - [`models`] - `Order`, `Side`, `Symbol`, participant keys
//! - [`messages`] - `Request` / `ResponseEvent` tagged enums
//! - [`spsc`] - the hand-rolled Lamport SPSC ring buffer
//! - [`orderbook`] - per-symbol price-time priority order book
//! - [`engine`] - routes requests to per-symbol order books
//! - [`ingress`] - record parsing and the Ingress stage loop
//! - [`egress`] - CSV formatting and the Egress stage loop
//! - [`pipeline`] - queues, shutdown signaling, stats, controller
//! - [`config`] - CLI-driven process configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod core_types;
pub mod egress;
pub mod engine;
pub mod ingress;
pub mod logging;
pub mod messages;
pub mod models;
pub mod orderbook;
pub mod pipeline;
pub mod spsc;

pub use config::Config;
pub use core_types::{Price, Qty, SeqNum, UserId, UserOrderId};
pub use engine::MatchingEngine;
pub use messages::{CancelRequest, NewOrderRequest, Request, ResponseEvent};
pub use models::{Order, OrderType, ParticipantKey, Side, Symbol};
pub use orderbook::OrderBook;
pub use pipeline::{PipelineController, PipelineQueues, PipelineStats, PipelineStatsSnapshot, ShutdownSignal};
