use bitflags::bitflags;
use std::time::{Duration, Instant};

bitflags! {
    /// Which per-node counters the executor should maintain for a statement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstrumentOptions: u32 {
        /// Wall-clock timing per node.
        const TIMER = 1 << 0;
        /// Shared/local buffer usage.
        const BUFFERS = 1 << 1;
        /// Row counts only (no clock reads).
        const ROWS = 1 << 2;
        /// Everything.
        const ALL = Self::TIMER.bits() | Self::BUFFERS.bits() | Self::ROWS.bits();
    }
}

/// Elapsed-time and row accumulator for one node or a whole statement.
///
/// A statement run under cursor semantics can enter `run` many times; each
/// entry is bracketed by [`start_node`](Self::start_node) /
/// [`stop_node`](Self::stop_node) and the open loop is folded into the
/// totals by [`end_loop`](Self::end_loop).
#[derive(Debug, Clone)]
pub struct Instrumentation {
    options: InstrumentOptions,
    started_at: Option<Instant>,
    running: bool,
    counter: Duration,
    tuples: u64,
    total: Duration,
    ntuples: u64,
    nloops: u64,
}

impl Instrumentation {
    /// Create an idle accumulator.
    pub fn new(options: InstrumentOptions) -> Self {
        Self {
            options,
            started_at: None,
            running: false,
            counter: Duration::ZERO,
            tuples: 0,
            total: Duration::ZERO,
            ntuples: 0,
            nloops: 0,
        }
    }

    /// Options this accumulator was created with.
    pub fn options(&self) -> InstrumentOptions {
        self.options
    }

    /// Mark the beginning of a measured interval.
    pub fn start_node(&mut self) {
        if self.options.contains(InstrumentOptions::TIMER) {
            self.started_at = Some(Instant::now());
        }
    }

    /// Close the interval opened by [`start_node`](Self::start_node).
    pub fn stop_node(&mut self, tuples: u64) {
        let elapsed = self
            .started_at
            .take()
            .map(|start| start.elapsed())
            .unwrap_or_default();
        self.accumulate(elapsed, tuples);
    }

    /// Add an externally measured interval to the open loop.
    pub fn accumulate(&mut self, elapsed: Duration, tuples: u64) {
        self.counter = self.counter.saturating_add(elapsed);
        self.tuples = self.tuples.saturating_add(tuples);
        self.running = true;
    }

    /// Fold the open loop into the totals.
    ///
    /// Calling this with no open loop is a no-op, so stacked observers may
    /// each finalize the same accumulator.
    pub fn end_loop(&mut self) {
        if !self.running {
            return;
        }
        self.total = self.total.saturating_add(self.counter);
        self.ntuples = self.ntuples.saturating_add(self.tuples);
        self.nloops += 1;
        self.counter = Duration::ZERO;
        self.tuples = 0;
        self.running = false;
        self.started_at = None;
    }

    /// Total time over completed loops.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Total time in milliseconds, exact to the nanosecond.
    pub fn total_ms(&self) -> f64 {
        self.total.as_nanos() as f64 / 1_000_000.0
    }

    /// Tuples over completed loops.
    pub fn tuples(&self) -> u64 {
        self.ntuples
    }

    /// Number of completed loops.
    pub fn loops(&self) -> u64 {
        self.nloops
    }

    /// Whether a loop is currently open.
    pub fn is_running(&self) -> bool {
        self.running
    }
}
