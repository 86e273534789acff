//! Tunables controlling which plans get logged and how.
//!
//! [`ExplainConfig`] is the plain value read by the hooks on every phase.
//! [`Settings`] is the shared, privilege-checked store administrators write
//! to, and [`TUNABLES`] are the definitions handed to the host's
//! configuration subsystem through [`ConfigRegistry`].
//!
//! # Example
//!
//! ```rust
//! use auto_explain::config::ExplainConfig;
//! use auto_explain::explain::ExplainFormat;
//!
//! let config = ExplainConfig::new()
//!     .with_min_duration_ms(250)
//!     .with_analyze(true)
//!     .with_format(ExplainFormat::Json)
//!     .with_sample_rate(0.1);
//! assert!(config.enabled());
//! ```

mod settings;
mod tunables;


pub use settings::Settings;
pub use tunables::{
    ConfigRegistry, MAX_MIN_DURATION_MS, NAMESPACE, TUNABLES, TunableDef, TunableKey, TunableKind,
    Unit, find_tunable, register_tunables,
};

use crate::error::{ConfigError, ConfigResult};
use crate::explain::ExplainFormat;
use serde::Deserialize;

/// Privilege level of whoever changes a tunable, and the level a tunable
/// requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Privilege {
    /// Ordinary session user.
    User,
    /// Administrator.
    Superuser,
}

/// Current values of all tunables.
///
/// By default logging is disabled (`log_min_duration = -1`) and every
/// top-level statement would be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplainConfig {
    /// Minimum statement duration in milliseconds; `0` logs every plan and
    /// `-1` turns logging off.
    pub log_min_duration: i32,
    /// Collect actual run-time statistics.
    pub log_analyze: bool,
    /// Verbose plan output.
    pub log_verbose: bool,
    /// Buffer usage; only with `log_analyze`.
    pub log_buffers: bool,
    /// Trigger statistics; only with `log_analyze`.
    pub log_triggers: bool,
    /// Per-node timing, not just row counts; only with `log_analyze`.
    pub log_timing: bool,
    /// Output format of the logged plan.
    pub log_format: ExplainFormat,
    /// Also log statements nested inside other statements.
    pub log_nested_statements: bool,
    /// Fraction of top-level statements to consider, in `[0.0, 1.0]`.
    pub sample_rate: f64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            log_min_duration: -1,
            log_analyze: false,
            log_verbose: false,
            log_buffers: false,
            log_triggers: false,
            log_timing: true,
            log_format: ExplainFormat::Text,
            log_nested_statements: false,
            sample_rate: 1.0,
        }
    }
}

impl ExplainConfig {
    /// Create a configuration with defaults (logging disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether plan logging is switched on at all.
    pub fn enabled(&self) -> bool {
        self.log_min_duration >= 0
    }

    /// Set the duration threshold, clamped to `[-1, MAX_MIN_DURATION_MS]`.
    pub fn with_min_duration_ms(mut self, ms: i32) -> Self {
        self.log_min_duration = ms.clamp(-1, MAX_MIN_DURATION_MS);
        self
    }

    /// Log every statement's plan regardless of duration.
    pub fn log_all(self) -> Self {
        self.with_min_duration_ms(0)
    }

    /// Turn plan logging off.
    pub fn disable(mut self) -> Self {
        self.log_min_duration = -1;
        self
    }

    pub fn with_analyze(mut self, on: bool) -> Self {
        self.log_analyze = on;
        self
    }

    pub fn with_verbose(mut self, on: bool) -> Self {
        self.log_verbose = on;
        self
    }

    pub fn with_buffers(mut self, on: bool) -> Self {
        self.log_buffers = on;
        self
    }

    pub fn with_triggers(mut self, on: bool) -> Self {
        self.log_triggers = on;
        self
    }

    pub fn with_timing(mut self, on: bool) -> Self {
        self.log_timing = on;
        self
    }

    pub fn with_format(mut self, format: ExplainFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_nested_statements(mut self, on: bool) -> Self {
        self.log_nested_statements = on;
        self
    }

    /// Set the sampling fraction, clamped to `[0.0, 1.0]`.
    ///
    /// `NaN` is treated as `0.0`.
    pub fn with_sample_rate(mut self, rate: f64) -> Self {
        self.sample_rate = if rate.is_nan() {
            0.0
        } else {
            rate.clamp(0.0, 1.0)
        };
        self
    }

    /// Check every value against its declared bounds.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(-1..=MAX_MIN_DURATION_MS).contains(&self.log_min_duration) {
            return Err(ConfigError::OutOfRange {
                name: format!("{NAMESPACE}.log_min_duration"),
                value: self.log_min_duration.to_string(),
                min: "-1".to_string(),
                max: MAX_MIN_DURATION_MS.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(ConfigError::OutOfRange {
                name: format!("{NAMESPACE}.sample_rate"),
                value: self.sample_rate.to_string(),
                min: "0".to_string(),
                max: "1".to_string(),
            });
        }
        Ok(())
    }

    /// Load from the `[auto_explain]` table of a TOML document.
    ///
    /// A document without that table yields the defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            auto_explain: ExplainConfig,
        }

        let doc: Document = toml::from_str(source)?;
        doc.auto_explain.validate()?;
        Ok(doc.auto_explain)
    }
}
