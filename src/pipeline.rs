//! Pipeline - queues, shutdown signaling, stats, and lifecycle control for
//! the three-stage Ingress → Matcher → Egress worker topology.
//!
//! ```text
//! [Ingress Parser] --InQ--> [Matcher] --OutQ--> [Egress Formatter]
//! ```
//!
//! Ingress is the sole producer on InQ; Matcher is the sole consumer on InQ
//! and sole producer on OutQ; Formatter is the sole consumer on OutQ - the
//! structure that makes the hand-rolled [`crate::spsc::SpscQueue`] sound.

use crate::messages::{Request, ResponseEvent};
use crate::spsc::{DEFAULT_CAPACITY, SpscQueue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Both queues of the pipeline, owned jointly by the three stage threads.
pub struct PipelineQueues {
    pub in_q: Arc<SpscQueue<Request>>,
    pub out_q: Arc<SpscQueue<ResponseEvent>>,
}

impl PipelineQueues {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(in_capacity: usize, out_capacity: usize) -> Self {
        Self {
            in_q: Arc::new(SpscQueue::with_capacity(in_capacity)),
            out_q: Arc::new(SpscQueue::with_capacity(out_capacity)),
        }
    }
}

impl Default for PipelineQueues {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// SHUTDOWN SIGNALING
// ============================================================

/// Shutdown signal for the three stages plus the overall controller flag.
///
/// A single top-level `requested` bit is what an external signal handler
/// (or a test) sets; the controller then flips the per-stage bits in the
/// precise order this requires (Ingress first, Matcher, then Egress),
/// so each stage only ever needs to check its own bit.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    ingress_stopped: AtomicBool,
    matcher_stopped: AtomicBool,
    egress_stopped: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn stop_ingress(&self) {
        self.ingress_stopped.store(true, Ordering::SeqCst);
    }

    pub fn stop_matcher(&self) {
        self.matcher_stopped.store(true, Ordering::SeqCst);
    }

    pub fn stop_egress(&self) {
        self.egress_stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_ingress_stopped(&self) -> bool {
        self.ingress_stopped.load(Ordering::SeqCst)
    }

    pub fn is_matcher_stopped(&self) -> bool {
        self.matcher_stopped.load(Ordering::SeqCst)
    }

    pub fn is_egress_stopped(&self) -> bool {
        self.egress_stopped.load(Ordering::SeqCst)
    }
}

// ============================================================
// PIPELINE STATISTICS
// ============================================================

/// Counters for the final report : total messages
/// processed by the matcher, total events published by the formatter, plus
/// the drop counters the error-handling table (§7) requires be observable.
#[derive(Debug, Default)]
pub struct PipelineStats {
    records_ingested: AtomicU64,
    records_dropped: AtomicU64,
    requests_processed: AtomicU64,
    events_emitted: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_record_ingested(&self) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStatsSnapshot {
    pub records_ingested: u64,
    pub records_dropped: u64,
    pub requests_processed: u64,
    pub events_emitted: u64,
}

impl std::fmt::Display for PipelineStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pipeline Stats: ingested={}, dropped={}, processed={}, emitted={}",
            self.records_ingested, self.records_dropped, self.requests_processed, self.events_emitted
        )
    }
}

// ============================================================
// MATCHER STAGE
// ============================================================

/// Target batch size when draining InQ .
const MATCHER_BATCH_SIZE: usize = 32;
/// Idle iterations before switching from the short to the long sleep tier.
const MATCHER_IDLE_SHORT_ITERS: u32 = 100;
const MATCHER_IDLE_SHORT_SLEEP: Duration = Duration::from_micros(1);
const MATCHER_IDLE_LONG_SLEEP: Duration = Duration::from_micros(100);
/// Bounded spin-retry count before a response event is dropped with a
/// warning when OutQ stays full .
const OUT_Q_PUSH_RETRY_ATTEMPTS: u32 = 1000;

/// Runs the Matcher stage loop: drain InQ in batches, dispatch each request
/// to the engine, push emitted events onto OutQ. Drains InQ to completion
/// once told to stop before returning .
pub fn run_matcher(
    mut engine: crate::engine::MatchingEngine,
    in_q: Arc<SpscQueue<Request>>,
    out_q: Arc<SpscQueue<ResponseEvent>>,
    shutdown: Arc<ShutdownSignal>,
    stats: Arc<PipelineStats>,
) {
    let mut scratch = Vec::new();
    let mut idle_iters: u32 = 0;

    loop {
        let mut drained = 0;
        while drained < MATCHER_BATCH_SIZE {
            let Some(req) = in_q.pop() else { break };
            dispatch(&mut engine, req, &mut scratch);
            stats.record_request_processed();
            for event in scratch.drain(..) {
                push_event_with_retry(&out_q, event, &stats);
            }
            drained += 1;
        }

        if drained > 0 {
            idle_iters = 0;
        }

        // Checked after every batch, not just idle ones, so the stage
        // honors its stop signal even under sustained load where InQ never
        // runs dry.
        if shutdown.is_matcher_stopped() {
            // One last drain pass in case Ingress enqueued something
            // between our last pop and the stop flag being set.
            while let Some(req) = in_q.pop() {
                dispatch(&mut engine, req, &mut scratch);
                stats.record_request_processed();
                for event in scratch.drain(..) {
                    push_event_with_retry(&out_q, event, &stats);
                }
            }
            return;
        }

        if drained == 0 {
            idle_iters = idle_iters.saturating_add(1);
            let sleep_for = if idle_iters <= MATCHER_IDLE_SHORT_ITERS {
                MATCHER_IDLE_SHORT_SLEEP
            } else {
                MATCHER_IDLE_LONG_SLEEP
            };
            thread::sleep(sleep_for);
        }
    }
}

fn dispatch(engine: &mut crate::engine::MatchingEngine, req: Request, out: &mut Vec<ResponseEvent>) {
    match req {
        Request::NewOrder(n) => engine.process_new_order(&n, out),
        Request::Cancel(c) => engine.process_cancel(&c, out),
        Request::Flush => engine.flush(),
    }
}

fn push_event_with_retry(queue: &SpscQueue<ResponseEvent>, event: ResponseEvent, stats: &PipelineStats) {
    for _ in 0..OUT_Q_PUSH_RETRY_ATTEMPTS - 1 {
        if queue.push(event.clone()) {
            return;
        }
        thread::yield_now();
    }
    if queue.push(event) {
        return;
    }
    tracing::warn!("dropped event: OutQ full after retry budget exhausted");
    stats.record_record_dropped();
}

// ============================================================
// PIPELINE CONTROLLER
// ============================================================

/// Starts the three stages and runs the shutdown drain sequence exactly as
/// 
pub struct PipelineController {
    ingress_handle: Option<JoinHandle<()>>,
    matcher_handle: Option<JoinHandle<()>>,
    egress_handle: Option<JoinHandle<()>>,
    shutdown: Arc<ShutdownSignal>,
    stats: Arc<PipelineStats>,
}

impl PipelineController {
    /// Starts stages consumers-first: Egress, then Matcher, then Ingress -
    /// so nothing produced is stranded.
    pub fn start<W>(
        engine: crate::engine::MatchingEngine,
        source: Box<dyn crate::ingress::DatagramSource>,
        sink: W,
        queues: PipelineQueues,
        shutdown: Arc<ShutdownSignal>,
        stats: Arc<PipelineStats>,
    ) -> Self
    where
        W: std::io::Write + Send + 'static,
    {
        let egress_handle = {
            let out_q = Arc::clone(&queues.out_q);
            let shutdown = Arc::clone(&shutdown);
            let stats = Arc::clone(&stats);
            thread::spawn(move || crate::egress::run_egress(sink, out_q, shutdown, stats))
        };

        let matcher_handle = {
            let in_q = Arc::clone(&queues.in_q);
            let out_q = Arc::clone(&queues.out_q);
            let shutdown = Arc::clone(&shutdown);
            let stats = Arc::clone(&stats);
            thread::spawn(move || run_matcher(engine, in_q, out_q, shutdown, stats))
        };

        let ingress_handle = {
            let in_q = Arc::clone(&queues.in_q);
            let shutdown = Arc::clone(&shutdown);
            let stats = Arc::clone(&stats);
            thread::spawn(move || crate::ingress::run_ingress(source, in_q, shutdown, stats))
        };

        Self {
            ingress_handle: Some(ingress_handle),
            matcher_handle: Some(matcher_handle),
            egress_handle: Some(egress_handle),
            shutdown,
            stats,
        }
    }

    /// Polls the shutdown flag at ~50ms granularity, then drives the
    /// five-step shutdown drain (§4.6 step 3) once it fires.
    pub fn run_until_shutdown(mut self) -> PipelineStatsSnapshot {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        const DRAIN_SLEEP: Duration = Duration::from_millis(200);

        while !self.shutdown.is_shutdown_requested() {
            thread::sleep(POLL_INTERVAL);
        }

        self.shutdown.stop_ingress();
        if let Some(h) = self.ingress_handle.take() {
            let _ = h.join();
        }

        thread::sleep(DRAIN_SLEEP);
        self.shutdown.stop_matcher();
        if let Some(h) = self.matcher_handle.take() {
            let _ = h.join();
        }

        thread::sleep(DRAIN_SLEEP);
        self.shutdown.stop_egress();
        if let Some(h) = self.egress_handle.take() {
            let _ = h.join();
        }

        self.stats.snapshot()
    }
}
