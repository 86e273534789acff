//! # auto_explain
//!
//! Automatic execution-plan logging for slow statements, layered onto a
//! query executor's start/run/finish/end hooks.
//!
//! ## Features
//!
//! - **Duration gated**: only statements running at least
//!   `log_min_duration` milliseconds are logged; `-1` switches logging off
//!   and costs a settings read per phase
//! - **Sampled**: a fraction of top-level statements is picked at random;
//!   statements nested inside them (triggers, functions) follow the same
//!   decision
//! - **Chain friendly**: installs in front of whatever observers are already
//!   hooked and restores them exactly on unload
//! - **Failure safe**: nesting depth is restored on every exit path, errors
//!   and panics pass through untouched
//! - **Structured output**: plans rendered by the engine in text, XML, JSON
//!   or YAML, emitted through `tracing`
//!
//! ## Quick start
//!
//! ```ignore
//! use auto_explain::{AutoExplain, ExplainConfig, Executor, Settings};
//! use std::sync::Arc;
//!
//! let executor = Executor::new(engine);
//! let settings = Arc::new(Settings::with_config(
//!     ExplainConfig::new()
//!         .with_min_duration_ms(250)
//!         .with_analyze(true)
//!         .with_sample_rate(0.1),
//! )?);
//!
//! let loaded = AutoExplain::new(renderer)
//!     .with_settings(settings)
//!     .load(&executor);
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod explain;
pub mod log;
pub mod observer;

pub use config::{ConfigRegistry, ExplainConfig, Privilege, Settings, TUNABLES, register_tunables};
pub use error::{ConfigError, ConfigResult, ExecError, ExecResult};
pub use executor::{
    ExecFlags, Executor, ExecutorHooks, ExecutorState, InstrumentOptions, Instrumentation,
    QueryDesc, ScanDirection, StandardExecutor,
};
pub use explain::{ExplainFormat, ExplainState, PlanRenderer};
pub use log::{PlanLogRecord, PlanLogSink, TracingPlanLog};
pub use observer::{AutoExplain, Loaded};
