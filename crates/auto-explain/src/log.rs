//! Log sink for plan records.

use crate::error::ExecResult;
use std::fmt;

/// One plan report, ready to be written to the server log.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLogRecord {
    /// Statement duration in milliseconds.
    pub duration_ms: f64,
    /// Rendered plan after post-processing.
    pub plan: String,
    /// Ask the sink not to append the statement text on its own.
    ///
    /// The surrounding log context already identifies the statement, and
    /// the rendered plan usually carries its text too.
    pub hide_statement: bool,
}

impl PlanLogRecord {
    pub fn new(duration_ms: f64, plan: impl Into<String>) -> Self {
        Self {
            duration_ms,
            plan: plan.into(),
            hide_statement: true,
        }
    }
}

impl fmt::Display for PlanLogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duration: {:.3} ms  plan:\n{}", self.duration_ms, self.plan)
    }
}

/// Destination for plan records.
pub trait PlanLogSink: Send + Sync {
    /// Write one record at informational severity.
    fn log(&self, record: &PlanLogRecord) -> ExecResult;
}

/// A `tracing`-based sink emitting each record as one `INFO` event with
/// target `auto_explain`.
///
/// The message is the formatted record; `duration_ms` and `hide_statement`
/// are attached as structured fields for subscribers that index them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPlanLog;

impl TracingPlanLog {
    pub fn new() -> Self {
        Self
    }
}

impl PlanLogSink for TracingPlanLog {
    fn log(&self, record: &PlanLogRecord) -> ExecResult {
        tracing::info!(
            target: "auto_explain",
            duration_ms = record.duration_ms,
            hide_statement = record.hide_statement,
            "{record}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_display_matches_log_line() {
        let record = PlanLogRecord::new(123.4567, "Seq Scan on t");
        assert_eq!(
            record.to_string(),
            "duration: 123.457 ms  plan:\nSeq Scan on t"
        );
        assert!(record.hide_statement);
    }

    #[test]
    fn tracing_sink_accepts_records_without_subscriber() {
        let sink = TracingPlanLog::new();
        assert!(sink.log(&PlanLogRecord::new(1.0, "Result")).is_ok());
    }
}
