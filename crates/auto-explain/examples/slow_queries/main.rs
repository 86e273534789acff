//! Log the plans of slow statements through `tracing`.
//!
//! Run with: `cargo run -p auto-explain --example slow_queries`
//!
//! Set `RUST_LOG=auto_explain=debug` to also see hook installation.

use auto_explain::{
    AutoExplain, ExecFlags, ExecResult, Executor, ExecutorState, ExplainFormat, ExplainState,
    PlanRenderer, Privilege, QueryDesc, ScanDirection, Settings, StandardExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Plan tree of the toy engine: one node per line.
struct Plan(Vec<&'static str>);

/// Engine that "runs" a statement by charging a fixed time to it.
struct SleepyEngine {
    per_run: Duration,
}

impl StandardExecutor for SleepyEngine {
    fn start(&self, desc: &mut QueryDesc, _: ExecFlags) -> ExecResult {
        desc.estate = Some(ExecutorState::new());
        Ok(())
    }

    fn run(&self, desc: &mut QueryDesc, _: ScanDirection, _: u64, _: bool) -> ExecResult {
        if let Some(total_time) = desc.total_time_mut() {
            total_time.accumulate(self.per_run, 1);
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

struct TreeRenderer;

impl PlanRenderer for TreeRenderer {
    fn begin_output(&self, es: &mut ExplainState) -> ExecResult {
        if es.format == ExplainFormat::Json {
            es.out.push_str("[\n");
        }
        Ok(())
    }

    fn query_text(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult {
        match es.format {
            ExplainFormat::Json => {
                es.out.push_str(&format!("  \"Query Text\": {:?},\n", desc.source_text))
            }
            _ => es.out.push_str(&format!("Query Text: {}\n", desc.source_text)),
        }
        Ok(())
    }

    fn print_plan(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult {
        let nodes = desc.plan::<Plan>().map(|p| p.0.as_slice()).unwrap_or(&[]);
        match es.format {
            ExplainFormat::Json => {
                es.out.push_str(&format!("  \"Plan\": {:?}", nodes));
            }
            _ => {
                for (depth, node) in nodes.iter().enumerate() {
                    let indent = "  ".repeat(depth);
                    let arrow = if depth == 0 { "" } else { "->  " };
                    es.out.push_str(&format!("{indent}{arrow}{node}\n"));
                }
            }
        }
        Ok(())
    }

    fn print_triggers(&self, _: &mut ExplainState, _: &QueryDesc) -> ExecResult {
        Ok(())
    }

    fn end_output(&self, es: &mut ExplainState) -> ExecResult {
        if es.format == ExplainFormat::Json {
            es.out.push_str("\n]\n");
        }
        Ok(())
    }
}

fn run(executor: &Executor, sql: &str, plan: Vec<&'static str>) -> ExecResult {
    let mut desc = QueryDesc::new(sql).with_plan(Plan(plan));
    executor.executor_start(&mut desc, ExecFlags::empty())?;
    executor.executor_run(&mut desc, ScanDirection::Forward, 0, true)?;
    executor.executor_finish(&mut desc)?;
    executor.executor_end(&mut desc)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let executor = Executor::new(SleepyEngine {
        per_run: Duration::from_millis(250),
    });
    let settings = Arc::new(Settings::from_pairs([
        ("auto_explain.log_min_duration", "200ms"),
        ("auto_explain.log_analyze", "on"),
    ]));

    let loaded = AutoExplain::new(TreeRenderer)
        .with_settings(settings.clone())
        .load(&executor);

    run(
        &executor,
        "SELECT * FROM orders JOIN customers USING (customer_id)",
        vec!["Hash Join", "Seq Scan on orders", "Hash", "Seq Scan on customers"],
    )?;

    settings.set("auto_explain.log_format", "json", Privilege::Superuser)?;
    run(
        &executor,
        "SELECT count(*) FROM events",
        vec!["Aggregate", "Seq Scan on events"],
    )?;

    loaded.unload(&executor);
    Ok(())
}
