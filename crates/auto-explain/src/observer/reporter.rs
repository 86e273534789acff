use crate::config::ExplainConfig;
use crate::error::ExecResult;
use crate::executor::QueryDesc;
use crate::explain::{ExplainFormat, ExplainState, PlanRenderer};
use crate::log::{PlanLogRecord, PlanLogSink};
use std::sync::Arc;

/// Report options for a finished statement.
///
/// `analyze` needs both the config flag and instrumentation actually having
/// been requested at start; buffers, timing and summary follow `analyze`.
pub fn explain_options(desc: &QueryDesc, config: &ExplainConfig) -> ExplainState {
    let analyze = !desc.instrument_options.is_empty() && config.log_analyze;
    ExplainState::new()
        .analyze(analyze)
        .verbose(config.log_verbose)
        .buffers(analyze && config.log_buffers)
        .timing(analyze && config.log_timing)
        .summary(analyze)
        .format(config.log_format)
}

/// Drop one trailing `\n`, if present.
pub fn trim_trailing_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
    }
}

/// Turn a single-element JSON array document into an object by rewriting
/// its first and last characters.
///
/// The renderer wraps JSON output in `[` ... `]`; a logged plan is one
/// object. Only that exact shape is rewritten, other text is left alone.
pub fn objectify_json(text: &mut String) {
    if text.len() >= 2 && text.starts_with('[') && text.ends_with(']') {
        let last = text.len() - 1;
        text.replace_range(last.., "}");
        text.replace_range(..1, "{");
    }
}

/// Renders and logs the plan of a statement that ran long enough.
pub struct PlanReporter {
    renderer: Arc<dyn PlanRenderer>,
    sink: Arc<dyn PlanLogSink>,
}

impl PlanReporter {
    pub fn new(renderer: Arc<dyn PlanRenderer>, sink: Arc<dyn PlanLogSink>) -> Self {
        Self { renderer, sink }
    }

    /// Finalize the statement's timing and log its plan if it crossed the
    /// threshold.
    ///
    /// Returns whether a record was emitted. Renderer and sink failures are
    /// returned unchanged.
    pub fn report(&self, desc: &mut QueryDesc, config: &ExplainConfig) -> ExecResult<bool> {
        let Some(total_time) = desc.total_time_mut() else {
            return Ok(false);
        };
        // Cursors may have entered run several times; close the last loop.
        total_time.end_loop();
        let msec = total_time.total_ms();
        if msec < f64::from(config.log_min_duration) {
            return Ok(false);
        }

        let mut es = explain_options(desc, config);
        self.renderer.begin_output(&mut es)?;
        self.renderer.query_text(&mut es, desc)?;
        self.renderer.print_plan(&mut es, desc)?;
        if es.analyze && config.log_triggers {
            self.renderer.print_triggers(&mut es, desc)?;
        }
        self.renderer.end_output(&mut es)?;

        let mut plan = es.out;
        trim_trailing_newline(&mut plan);
        if config.log_format == ExplainFormat::Json {
            objectify_json(&mut plan);
        }

        self.sink.log(&PlanLogRecord::new(msec, plan))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InstrumentOptions;

    #[test]
    fn trims_exactly_one_newline() {
        let mut text = "plan\n\n".to_string();
        trim_trailing_newline(&mut text);
        assert_eq!(text, "plan\n");
        trim_trailing_newline(&mut text);
        assert_eq!(text, "plan");
        trim_trailing_newline(&mut text);
        assert_eq!(text, "plan");

        let mut empty = String::new();
        trim_trailing_newline(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn json_array_wrapper_becomes_object() {
        let mut text = "[\n  {\n    \"Plan\": {}\n  }\n]\n".to_string();
        trim_trailing_newline(&mut text);
        objectify_json(&mut text);
        assert!(text.starts_with('{'));
        assert!(text.ends_with('}'));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn non_array_text_is_left_alone() {
        for input in ["", "[", "{\"Plan\": {}}", "Seq Scan on t"] {
            let mut text = input.to_string();
            objectify_json(&mut text);
            assert_eq!(text, input);
        }
    }

    #[test]
    fn options_without_analyze_are_all_off() {
        let config = ExplainConfig::new()
            .log_all()
            .with_buffers(true)
            .with_timing(true)
            .with_verbose(true);
        let mut desc = QueryDesc::new("SELECT 1");
        desc.instrument_options = InstrumentOptions::TIMER;

        let es = explain_options(&desc, &config);
        assert!(!es.analyze && !es.buffers && !es.timing && !es.summary);
        assert!(es.verbose);
    }

    #[test]
    fn options_need_instrumentation_for_analyze() {
        let config = ExplainConfig::new()
            .log_all()
            .with_analyze(true)
            .with_buffers(true)
            .with_format(ExplainFormat::Yaml);

        let desc = QueryDesc::new("SELECT 1");
        assert!(!explain_options(&desc, &config).analyze);

        let mut desc = QueryDesc::new("SELECT 1");
        desc.instrument_options = InstrumentOptions::TIMER | InstrumentOptions::BUFFERS;
        let es = explain_options(&desc, &config);
        assert!(es.analyze && es.buffers && es.timing && es.summary);
        assert_eq!(es.format, ExplainFormat::Yaml);
    }
}
