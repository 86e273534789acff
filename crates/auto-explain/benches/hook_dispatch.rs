//! Per-statement cost of the observer on top of the bare executor.
//!
//! The disabled case is the one every statement pays when auto_explain is
//! loaded but `log_min_duration` is -1.

use auto_explain::{
    AutoExplain, ExecFlags, ExecResult, Executor, ExecutorState, ExplainConfig, ExplainState,
    PlanLogRecord, PlanLogSink, PlanRenderer, QueryDesc, ScanDirection, Settings,
    StandardExecutor,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;

struct NoopEngine;

impl StandardExecutor for NoopEngine {
    fn start(&self, desc: &mut QueryDesc, _: ExecFlags) -> ExecResult {
        desc.estate = Some(ExecutorState::new());
        Ok(())
    }

    fn run(&self, desc: &mut QueryDesc, _: ScanDirection, _: u64, _: bool) -> ExecResult {
        if let Some(total_time) = desc.total_time_mut() {
            total_time.accumulate(Duration::from_micros(10), 1);
        }
        Ok(())
    }

    fn finish(&self, _: &mut QueryDesc) -> ExecResult {
        Ok(())
    }

    fn end(&self, desc: &mut QueryDesc) -> ExecResult {
        desc.estate = None;
        Ok(())
    }
}

struct OneLineRenderer;

impl PlanRenderer for OneLineRenderer {
    fn begin_output(&self, _: &mut ExplainState) -> ExecResult {
        Ok(())
    }

    fn query_text(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult {
        es.out.push_str(&desc.source_text);
        es.out.push('\n');
        Ok(())
    }

    fn print_plan(&self, es: &mut ExplainState, _: &QueryDesc) -> ExecResult {
        es.out.push_str("Result\n");
        Ok(())
    }

    fn print_triggers(&self, _: &mut ExplainState, _: &QueryDesc) -> ExecResult {
        Ok(())
    }

    fn end_output(&self, _: &mut ExplainState) -> ExecResult {
        Ok(())
    }
}

struct DiscardSink;

impl PlanLogSink for DiscardSink {
    fn log(&self, record: &PlanLogRecord) -> ExecResult {
        black_box(record);
        Ok(())
    }
}

fn statement(executor: &Executor) {
    let mut desc = QueryDesc::new("SELECT 1");
    executor.executor_start(&mut desc, ExecFlags::empty()).ok();
    executor
        .executor_run(&mut desc, ScanDirection::Forward, 0, true)
        .ok();
    executor.executor_finish(&mut desc).ok();
    executor.executor_end(&mut desc).ok();
    black_box(desc);
}

fn loaded(config: ExplainConfig) -> Executor {
    let executor = Executor::new(NoopEngine);
    let settings = Arc::new(Settings::with_config(config).expect("valid config"));
    // The hooks stay installed after the handle is dropped.
    let _loaded = AutoExplain::new(OneLineRenderer)
        .with_settings(settings)
        .with_sink(DiscardSink)
        .load(&executor);
    executor
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("hook_dispatch/statement");

    let bare = Executor::new(NoopEngine);
    group.bench_function("bare", |b| b.iter(|| statement(&bare)));

    let disabled = loaded(ExplainConfig::new());
    group.bench_function("disabled", |b| b.iter(|| statement(&disabled)));

    let unsampled = loaded(ExplainConfig::new().log_all().with_sample_rate(0.0));
    group.bench_function("unsampled", |b| b.iter(|| statement(&unsampled)));

    let logging = loaded(ExplainConfig::new().log_all().with_analyze(true));
    group.bench_function("logging", |b| b.iter(|| statement(&logging)));

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
