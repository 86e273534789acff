use crate::config::ExplainConfig;
use crate::executor::{ExecFlags, InstrumentOptions, Instrumentation, QueryDesc};

/// Whether plan logging applies at the current nesting depth.
pub fn logging_enabled(config: &ExplainConfig, depth: usize) -> bool {
    config.enabled() && (depth == 0 || config.log_nested_statements)
}

/// Per-node counters to request for a statement, given the config.
///
/// Empty unless `log_analyze` is set; then always one of timer or row
/// counts, plus buffers when asked for.
pub fn requested_instrumentation(config: &ExplainConfig) -> InstrumentOptions {
    if !config.log_analyze {
        return InstrumentOptions::empty();
    }
    let mut options = if config.log_timing {
        InstrumentOptions::TIMER
    } else {
        InstrumentOptions::ROWS
    };
    if config.log_buffers {
        options |= InstrumentOptions::BUFFERS;
    }
    options
}

/// Combined enabled/sampled predicate for one phase call.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentationGate<'a> {
    config: &'a ExplainConfig,
    open: bool,
}

impl<'a> InstrumentationGate<'a> {
    pub fn new(config: &'a ExplainConfig, depth: usize, sampled: bool) -> Self {
        Self {
            config,
            open: sampled && logging_enabled(config, depth),
        }
    }

    /// Whether this statement is being watched.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Ask the executor for per-node counters before the statement starts.
    ///
    /// Nothing is requested for plan-only starts, which never execute.
    pub fn activate(&self, desc: &mut QueryDesc, eflags: ExecFlags) {
        if !self.open || eflags.contains(ExecFlags::EXPLAIN_ONLY) {
            return;
        }
        desc.instrument_options |= requested_instrumentation(self.config);
    }

    /// Make sure the statement has an elapsed-time accumulator.
    ///
    /// The accumulator goes into the statement's own executor state so it is
    /// released together with it at end. An accumulator allocated by another
    /// observer is reused as-is.
    pub fn ensure_total_time(&self, desc: &mut QueryDesc) {
        if !self.open {
            return;
        }
        match desc.estate.as_mut() {
            Some(estate) => {
                estate
                    .total_time
                    .get_or_insert_with(|| Instrumentation::new(InstrumentOptions::ALL));
            }
            None => tracing::debug!(
                target: "auto_explain",
                "no executor state after start, elapsed time not tracked"
            ),
        }
    }
}
