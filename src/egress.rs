//! Egress Formatter (stage 3) - drains OutQ and serializes each event to a
//! CSV line per §6.2, flushing after every line.

use crate::messages::ResponseEvent;
use crate::pipeline::{PipelineStats, ShutdownSignal};
use crate::spsc::SpscQueue;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const IDLE_SLEEP: Duration = Duration::from_micros(10);

/// Formats one event as a single LF-terminated CSV line, per the wire
/// format in §6.2. A single space follows each comma.
pub fn format_event(event: &ResponseEvent) -> String {
    match event {
        ResponseEvent::Ack { user_id, user_order_id, symbol } => {
            format!("A, {user_id}, {user_order_id}, {symbol}\n")
        }
        ResponseEvent::Trade {
            buy_user_id,
            buy_user_order_id,
            sell_user_id,
            sell_user_order_id,
            price,
            qty,
            symbol,
        } => format!(
            "T, {buy_user_id}, {buy_user_order_id}, {sell_user_id}, {sell_user_order_id}, {price}, {qty}, {symbol}\n"
        ),
        ResponseEvent::TopOfBook { side, level, symbol } => match level {
            Some((price, qty)) => format!("B, {}, {price}, {qty}, {symbol}\n", side.as_wire_char()),
            None => format!("B, {}, -, -, {symbol}\n", side.as_wire_char()),
        },
        ResponseEvent::CancelAck { user_id, user_order_id, symbol } => {
            format!("C, {user_id}, {user_order_id}, {symbol}\n")
        }
    }
}

/// Runs the Egress stage loop: drain OutQ, format, write, flush. Drains any
/// residue left in the queue once shutdown is requested before returning.
pub fn run_egress<W: Write>(
    mut sink: W,
    out_q: Arc<SpscQueue<ResponseEvent>>,
    shutdown: Arc<ShutdownSignal>,
    stats: Arc<PipelineStats>,
) {
    loop {
        match out_q.pop() {
            Some(event) => {
                let line = format_event(&event);
                if let Err(err) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
                    tracing::error!(?err, "egress write failed, stopping");
                    return;
                }
                stats.record_event_emitted();
            }
            None => {
                if shutdown.is_egress_stopped() {
                    return;
                }
                std::thread::sleep(IDLE_SLEEP);
            }
        }
    }
}
