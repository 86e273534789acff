#![allow(dead_code)]

//! A scripted in-memory engine for driving the executor end to end.

use auto_explain::{
    ExecError, ExecFlags, ExecResult, Executor, ExecutorState, ExplainFormat, ExplainState,
    InstrumentOptions, PlanLogRecord, PlanLogSink, PlanRenderer, QueryDesc, ScanDirection,
    StandardExecutor,
};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

/// How a scripted statement fails during its run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Error,
    Panic,
}

/// A statement script: its text, how long its run takes, and the statements
/// it executes from inside its own run and finish phases.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub elapsed: Duration,
    pub in_run: Vec<Statement>,
    pub in_finish: Vec<Statement>,
    pub fail: Option<Failure>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            elapsed: Duration::ZERO,
            in_run: Vec::new(),
            in_finish: Vec::new(),
            fail: None,
        }
    }

    pub fn taking(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn taking_ms(self, ms: u64) -> Self {
        self.taking(Duration::from_millis(ms))
    }

    /// Execute `child` from inside this statement's run phase.
    pub fn calls(mut self, child: Statement) -> Self {
        self.in_run.push(child);
        self
    }

    /// Execute `child` from inside this statement's finish phase, the way an
    /// AFTER trigger fires.
    pub fn fires(mut self, child: Statement) -> Self {
        self.in_finish.push(child);
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.fail = Some(failure);
        self
    }
}

/// What the engine saw when a statement entered its run phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub sql: String,
    pub instrument_options: InstrumentOptions,
    pub tracked: bool,
}

/// Standard executor running [`Statement`] scripts.
///
/// Nested statements are executed through the full executor so every
/// installed hook sees them.
#[derive(Default)]
pub struct FakeEngine {
    executor: OnceLock<Weak<Executor>>,
    observed: Mutex<Vec<Observed>>,
    ended: Mutex<Vec<String>>,
}

impl FakeEngine {
    /// Build an executor around a fresh engine.
    pub fn executor() -> (Arc<Executor>, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine::default());
        let executor = Arc::new(Executor::with_standard_arc(engine.clone()));
        let _ = engine.executor.set(Arc::downgrade(&executor));
        (executor, engine)
    }

    pub fn observed(&self) -> Vec<Observed> {
        self.observed.lock().unwrap().clone()
    }

    pub fn ended(&self) -> Vec<String> {
        self.ended.lock().unwrap().clone()
    }

    fn execute_nested(&self, children: &[Statement]) -> ExecResult {
        let executor = self
            .executor
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ExecError::engine("engine detached from executor"))?;
        for child in children {
            execute(&executor, child)?;
        }
        Ok(())
    }
}

fn script(desc: &QueryDesc) -> ExecResult<Statement> {
    desc.plan::<Statement>()
        .cloned()
        .ok_or_else(|| ExecError::engine("no plan"))
}

impl StandardExecutor for FakeEngine {
    fn start(&self, desc: &mut QueryDesc, _: ExecFlags) -> ExecResult {
        desc.estate = Some(ExecutorState::new());
        Ok(())
    }

    fn run(&self, desc: &mut QueryDesc, _: ScanDirection, _: u64, _: bool) -> ExecResult {
        let stmt = script(desc)?;
        self.observed.lock().unwrap().push(Observed {
            sql: stmt.sql.clone(),
            instrument_options: desc.instrument_options,
            tracked: desc.total_time().is_some(),
        });

        self.execute_nested(&stmt.in_run)?;
        match stmt.fail {
            Some(Failure::Error) => return Err(ExecError::engine(format!("{} failed", stmt.sql))),
            Some(Failure::Panic) => panic!("{} panicked", stmt.sql),
            None => {}
        }

        if let Some(estate) = desc.estate.as_mut() {
            estate.processed += 1;
            if let Some(total_time) = estate.total_time.as_mut() {
                total_time.accumulate(stmt.elapsed, 1);
            }
        }
        Ok(())
    }

    fn finish(&self, desc: &mut QueryDesc) -> ExecResult {
        let stmt = script(desc)?;
        self.execute_nested(&stmt.in_finish)
    }

    fn end(&self, desc: &mut QueryDesc) -> ExecResult {
        self.ended.lock().unwrap().push(desc.source_text.clone());
        desc.estate = None;
        Ok(())
    }
}

/// Run all four phases of `stmt`.
pub fn execute(executor: &Executor, stmt: &Statement) -> ExecResult {
    let mut desc = QueryDesc::new(stmt.sql.clone()).with_plan(stmt.clone());
    executor.executor_start(&mut desc, ExecFlags::empty())?;
    executor.executor_run(&mut desc, ScanDirection::Forward, 0, true)?;
    executor.executor_finish(&mut desc)?;
    executor.executor_end(&mut desc)
}

/// Renderer producing a small text or JSON plan and recording how it was
/// driven.
#[derive(Default)]
pub struct FakeRenderer {
    calls: Mutex<Vec<&'static str>>,
    options: Mutex<Vec<ExplainState>>,
}

impl FakeRenderer {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Report options as they were at `begin_output`, one per report.
    pub fn options(&self) -> Vec<ExplainState> {
        self.options.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PlanRenderer for FakeRenderer {
    fn begin_output(&self, es: &mut ExplainState) -> ExecResult {
        self.record("begin_output");
        self.options.lock().unwrap().push(es.clone());
        if es.format == ExplainFormat::Json {
            es.out.push_str("[\n");
        }
        Ok(())
    }

    fn query_text(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult {
        self.record("query_text");
        match es.format {
            ExplainFormat::Json => {
                let text = serde_json::to_string(&desc.source_text)
                    .map_err(|e| ExecError::render(e.to_string()))?;
                es.out.push_str(&format!("  \"Query Text\": {text},\n"));
            }
            _ => es.out.push_str(&format!("Query Text: {}\n", desc.source_text)),
        }
        Ok(())
    }

    fn print_plan(&self, es: &mut ExplainState, _: &QueryDesc) -> ExecResult {
        self.record("print_plan");
        match (es.format, es.analyze) {
            (ExplainFormat::Json, false) => {
                es.out.push_str("  \"Plan\": {\"Node Type\": \"Result\"}")
            }
            (ExplainFormat::Json, true) => es
                .out
                .push_str("  \"Plan\": {\"Node Type\": \"Result\", \"Actual Loops\": 1}"),
            (_, false) => es.out.push_str("Result\n"),
            (_, true) => es.out.push_str("Result (actual rows=1 loops=1)\n"),
        }
        Ok(())
    }

    fn print_triggers(&self, es: &mut ExplainState, _: &QueryDesc) -> ExecResult {
        self.record("print_triggers");
        match es.format {
            ExplainFormat::Json => es.out.push_str(",\n  \"Triggers\": []"),
            _ => es.out.push_str("Trigger audit: calls=1\n"),
        }
        Ok(())
    }

    fn end_output(&self, es: &mut ExplainState) -> ExecResult {
        self.record("end_output");
        if es.format == ExplainFormat::Json {
            es.out.push_str("\n]\n");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<PlanLogRecord>>);

impl RecordingSink {
    pub fn records(&self) -> Vec<PlanLogRecord> {
        self.0.lock().unwrap().clone()
    }

    pub fn logged_sql(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(|r| r.plan.lines().next())
            .map(|line| line.trim_start_matches("Query Text: ").to_string())
            .collect()
    }
}

impl PlanLogSink for RecordingSink {
    fn log(&self, record: &PlanLogRecord) -> ExecResult {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Sink that rejects every record.
pub struct FailingSink;

impl PlanLogSink for FailingSink {
    fn log(&self, _: &PlanLogRecord) -> ExecResult {
        Err(ExecError::Log("disk full".to_string()))
    }
}
