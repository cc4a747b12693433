//! Ingress Parser (stage 1) - splits datagram payloads into CSV records and
//! parses each into a [`Request`], enqueuing onto InQ.

use crate::messages::{CancelRequest, NewOrderRequest, Request};
use crate::models::{Side, Symbol, SymbolTooLong};
use crate::pipeline::{PipelineStats, ShutdownSignal};
use crate::spsc::SpscQueue;
use std::sync::Arc;
use thiserror::Error;

/// The core needs only this much from the socket layer: something that
/// blocks until a datagram arrives. Socket setup, OS tuning, and signal
/// handling all live outside this crate's scope.
pub trait DatagramSource: Send {
    /// Blocks until a datagram arrives or the source is closed, in which
    /// case it returns `Ok(0)`.
    fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Production [`DatagramSource`] backed by a UDP socket.
pub struct UdpDatagramSource {
    socket: std::net::UdpSocket,
}

impl UdpDatagramSource {
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        Ok(Self { socket })
    }
}

impl DatagramSource for UdpDatagramSource {
    fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.socket.recv(buf)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty record")]
    Empty,
    #[error("unknown record discriminator: {0:?}")]
    UnknownDiscriminator(String),
    #[error("wrong field count for record type")]
    WrongFieldCount,
    #[error("zero quantity on new order")]
    ZeroQuantity,
    #[error("invalid side, expected B or S: {0:?}")]
    InvalidSide(String),
    #[error("invalid numeric field: {0:?}")]
    InvalidNumber(String),
    #[error(transparent)]
    SymbolTooLong(#[from] SymbolTooLong),
}

/// Parses one already-trimmed, non-comment, non-empty CSV record into a
/// [`Request`].
pub fn parse_record(record: &str) -> Result<Request, ParseError> {
    let mut fields = record.split(',').map(str::trim);
    let disc = fields.next().ok_or(ParseError::Empty)?;
    match disc {
        "N" => {
            let user_id = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            let symbol = Symbol::parse(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            let price = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            let qty = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            let side_str = fields.next().ok_or(ParseError::WrongFieldCount)?;
            let user_order_id = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            if fields.next().is_some() {
                return Err(ParseError::WrongFieldCount);
            }
            if qty == 0 {
                return Err(ParseError::ZeroQuantity);
            }
            let side = match side_str {
                "B" => Side::Buy,
                "S" => Side::Sell,
                other => return Err(ParseError::InvalidSide(other.to_string())),
            };
            Ok(Request::NewOrder(NewOrderRequest { user_id, symbol, price, qty, side, user_order_id }))
        }
        "C" => {
            let user_id = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            let user_order_id = parse_u32(fields.next().ok_or(ParseError::WrongFieldCount)?)?;
            if fields.next().is_some() {
                return Err(ParseError::WrongFieldCount);
            }
            Ok(Request::Cancel(CancelRequest { user_id, user_order_id }))
        }
        "F" => {
            if fields.next().is_some() {
                return Err(ParseError::WrongFieldCount);
            }
            Ok(Request::Flush)
        }
        other => Err(ParseError::UnknownDiscriminator(other.to_string())),
    }
}

fn parse_u32(s: &str) -> Result<u32, ParseError> {
    s.parse::<u32>().map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

/// Splits a datagram payload into trimmed, non-empty, non-comment records.
/// LF and CRLF are both accepted line terminators.
pub fn split_records(payload: &str) -> impl Iterator<Item = &str> {
    payload.split('\n').filter_map(|line| {
        let trimmed = line.trim_end_matches('\r').trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Bounded spin-retry count before a parsed record is dropped with a
/// warning when InQ stays full.
const PUSH_RETRY_ATTEMPTS: u32 = 100;

/// Runs the Ingress stage loop: receive datagrams, split into records,
/// parse, and push parsed requests onto InQ until shutdown is requested.
pub fn run_ingress(
    mut source: Box<dyn DatagramSource>,
    in_q: Arc<SpscQueue<Request>>,
    shutdown: Arc<ShutdownSignal>,
    stats: Arc<PipelineStats>,
) {
    let mut buf = vec![0u8; 65536];
    while !shutdown.is_ingress_stopped() {
        let n = match source.recv(&mut buf) {
            Ok(0) => {
                // Source closed (e.g. EOF in tests); treat as a quiet stop.
                break;
            }
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(?err, "datagram receive failed, continuing");
                continue;
            }
        };

        let Ok(payload) = std::str::from_utf8(&buf[..n]) else {
            tracing::warn!("dropped datagram: not valid utf-8");
            stats.record_record_dropped();
            continue;
        };

        for record in split_records(payload) {
            match parse_record(record) {
                Ok(req) => push_with_retry(&in_q, req, &stats),
                Err(err) => {
                    tracing::warn!(%err, record, "dropped malformed record");
                    stats.record_record_dropped();
                }
            }
        }
    }
}

fn push_with_retry(queue: &SpscQueue<Request>, req: Request, stats: &PipelineStats) {
    for _ in 0..PUSH_RETRY_ATTEMPTS - 1 {
        if queue.push(req.clone()) {
            stats.record_record_ingested();
            return;
        }
        std::thread::yield_now();
    }
    if queue.push(req) {
        stats.record_record_ingested();
        return;
    }
    tracing::warn!("dropped record: InQ full after retry budget exhausted");
    stats.record_record_dropped();
}
