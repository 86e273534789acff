//! The auto_explain observer: sampled, duration-gated plan logging wired
//! into the executor's hook chain.
//!
//! Loading captures whatever occupied the four hook slots and installs this
//! observer in front of it. Per statement:
//!
//! - **start**: top-level statements draw a sampling decision (nested ones
//!   inherit it); watched statements get per-node instrumentation requested
//!   and an elapsed-time accumulator allocated in their executor state.
//! - **run** / **finish**: the nesting depth is raised for the duration of
//!   the delegated call and restored on every exit path.
//! - **end**: if the statement was watched and ran at least
//!   `log_min_duration`, its plan is rendered and logged before the end
//!   phase is delegated.
//!
//! # Example
//!
//! ```rust,ignore
//! use auto_explain::{AutoExplain, ExplainConfig, Executor, Settings};
//! use std::sync::Arc;
//!
//! let executor = Executor::new(MyEngine::default());
//! let settings = Arc::new(Settings::with_config(
//!     ExplainConfig::new().with_min_duration_ms(250).with_analyze(true),
//! )?);
//!
//! let loaded = AutoExplain::new(MyRenderer)
//!     .with_settings(settings)
//!     .load(&executor);
//!
//! // ... statements executed through `executor` are now observed ...
//!
//! loaded.unload(&executor);
//! ```

mod chain;
mod depth;
mod gate;
mod reporter;
mod sampling;


pub use chain::HookChain;
pub use depth::{DepthGuard, DepthTracker};
pub use gate::{InstrumentationGate, logging_enabled, requested_instrumentation};
pub use reporter::{PlanReporter, explain_options, objectify_json, trim_trailing_newline};
pub use sampling::SamplingDecider;

use crate::config::{Settings, register_tunables};
use crate::error::ExecResult;
use crate::executor::{ExecFlags, Executor, ExecutorHooks, QueryDesc, ScanDirection};
use crate::explain::PlanRenderer;
use crate::log::{PlanLogSink, TracingPlanLog};
use std::sync::Arc;

/// Builder for the observer.
///
/// Defaults: fresh [`Settings`] (logging disabled), [`TracingPlanLog`] as
/// the sink, and an OS-seeded sampler.
pub struct AutoExplain {
    settings: Arc<Settings>,
    renderer: Arc<dyn PlanRenderer>,
    sink: Arc<dyn PlanLogSink>,
    seed: Option<u64>,
}

impl AutoExplain {
    /// Create an observer rendering plans with `renderer`.
    pub fn new<R: PlanRenderer + 'static>(renderer: R) -> Self {
        Self::with_renderer_arc(Arc::new(renderer))
    }

    /// Create an observer from an Arc-wrapped renderer.
    pub fn with_renderer_arc(renderer: Arc<dyn PlanRenderer>) -> Self {
        Self {
            settings: Arc::new(Settings::new()),
            renderer,
            sink: Arc::new(TracingPlanLog),
            seed: None,
        }
    }

    /// Use a shared settings store.
    pub fn with_settings(mut self, settings: Arc<Settings>) -> Self {
        self.settings = settings;
        self
    }

    /// Set the log sink.
    pub fn with_sink<S: PlanLogSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Set the log sink from an Arc.
    pub fn with_sink_arc(mut self, sink: Arc<dyn PlanLogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Seed the sampler for a reproducible sequence of decisions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Register the tunables and install the hooks.
    ///
    /// Each slot's current occupant (possibly nothing) is captured and
    /// becomes the next link this observer delegates to.
    pub fn load(self, executor: &Executor) -> Loaded {
        register_tunables(self.settings.as_ref());

        let sampler = match self.seed {
            Some(seed) => SamplingDecider::with_seed(seed),
            None => SamplingDecider::new(),
        };
        let standard = executor.standard();

        let loaded = executor.update_hooks(|hooks| {
            let observer = Arc::new(Observer {
                settings: self.settings,
                sampler,
                depth: DepthTracker::new(),
                reporter: PlanReporter::new(self.renderer, self.sink),
                chain: HookChain::new(hooks.clone(), standard),
            });
            let installed = observer.hooks();
            *hooks = installed.clone();
            Loaded {
                observer,
                installed,
            }
        });

        tracing::debug!(target: "auto_explain", "executor hooks installed");
        loaded
    }
}

/// Handle to an installed observer.
#[must_use = "dropping the handle leaves the hooks installed with no way to unload them"]
pub struct Loaded {
    observer: Arc<Observer>,
    installed: ExecutorHooks,
}

impl Loaded {
    /// Restore the four slots to what they held at load time.
    ///
    /// If another observer replaced a slot after this one was loaded, it is
    /// unhooked along with this one; a warning is logged in that case.
    pub fn unload(self, executor: &Executor) {
        executor.update_hooks(|hooks| {
            if !hooks.same_as(&self.installed) {
                tracing::warn!(
                    target: "auto_explain",
                    "executor hooks changed since auto_explain was loaded, restoring anyway"
                );
            }
            *hooks = self.observer.chain.previous().clone();
        });
        tracing::debug!(target: "auto_explain", "executor hooks uninstalled");
    }

    /// Shared settings store read by the hooks.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.observer.settings
    }

    /// Current run/finish nesting depth.
    pub fn nesting_level(&self) -> usize {
        self.observer.depth.current()
    }

    /// Sampling outcome of the current (or last) top-level statement.
    pub fn current_sampled(&self) -> bool {
        self.observer.sampler.current()
    }
}

struct Observer {
    settings: Arc<Settings>,
    sampler: SamplingDecider,
    depth: DepthTracker,
    reporter: PlanReporter,
    chain: HookChain,
}

impl Observer {
    fn hooks(self: &Arc<Self>) -> ExecutorHooks {
        let start = Arc::clone(self);
        let run = Arc::clone(self);
        let finish = Arc::clone(self);
        let end = Arc::clone(self);
        ExecutorHooks {
            start: Some(Arc::new(move |desc: &mut QueryDesc, eflags: ExecFlags| {
                start.executor_start(desc, eflags)
            })),
            run: Some(Arc::new(
                move |desc: &mut QueryDesc,
                      direction: ScanDirection,
                      count: u64,
                      execute_once: bool| {
                    run.executor_run(desc, direction, count, execute_once)
                },
            )),
            finish: Some(Arc::new(move |desc: &mut QueryDesc| {
                finish.executor_finish(desc)
            })),
            end: Some(Arc::new(move |desc: &mut QueryDesc| end.executor_end(desc))),
        }
    }

    fn executor_start(&self, desc: &mut QueryDesc, eflags: ExecFlags) -> ExecResult {
        let config = self.settings.snapshot();
        let depth = self.depth.current();
        let sampled = self
            .sampler
            .should_sample(depth == 0, config.enabled(), config.sample_rate);

        InstrumentationGate::new(&config, depth, sampled).activate(desc, eflags);

        self.chain.call_start(desc, eflags)?;

        InstrumentationGate::new(&config, self.depth.current(), self.sampler.current())
            .ensure_total_time(desc);
        Ok(())
    }

    fn executor_run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
        execute_once: bool,
    ) -> ExecResult {
        self.depth
            .nested(|| self.chain.call_run(desc, direction, count, execute_once))
    }

    fn executor_finish(&self, desc: &mut QueryDesc) -> ExecResult {
        self.depth.nested(|| self.chain.call_finish(desc))
    }

    fn executor_end(&self, desc: &mut QueryDesc) -> ExecResult {
        let config = self.settings.snapshot();
        let gate = InstrumentationGate::new(&config, self.depth.current(), self.sampler.current());
        let reported = if gate.is_open() && desc.total_time().is_some() {
            self.reporter.report(desc, &config).map(drop)
        } else {
            Ok(())
        };
        // End is delegated even when reporting failed.
        let ended = self.chain.call_end(desc);
        reported.and(ended)
    }
}
