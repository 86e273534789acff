//! Interface to the plan renderer.
//!
//! Rendering itself belongs to the engine; this module only defines the
//! report state handed to it and the calls made against it.

use crate::error::ExecResult;
use crate::executor::QueryDesc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format of a rendered plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainFormat {
    #[default]
    Text,
    Xml,
    Json,
    Yaml,
}

impl ExplainFormat {
    /// Every format, in declaration order.
    pub const ALL: [ExplainFormat; 4] = [Self::Text, Self::Xml, Self::Json, Self::Yaml];

    /// The configuration name of this format.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ExplainFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExplainFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// Report options plus the text buffer the renderer appends to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplainState {
    /// Include actual run-time statistics.
    pub analyze: bool,
    /// Include output columns and other detail.
    pub verbose: bool,
    /// Include buffer usage.
    pub buffers: bool,
    /// Include per-node timing.
    pub timing: bool,
    /// Include the summary footer.
    pub summary: bool,
    /// Output format.
    pub format: ExplainFormat,
    /// Rendered output so far.
    pub out: String,
}

impl ExplainState {
    /// Fresh state with every option off and an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(mut self, on: bool) -> Self {
        self.analyze = on;
        self
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    pub fn buffers(mut self, on: bool) -> Self {
        self.buffers = on;
        self
    }

    pub fn timing(mut self, on: bool) -> Self {
        self.timing = on;
        self
    }

    pub fn summary(mut self, on: bool) -> Self {
        self.summary = on;
        self
    }

    pub fn format(mut self, format: ExplainFormat) -> Self {
        self.format = format;
        self
    }

    /// Length of the rendered buffer in bytes.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}

/// The engine's plan renderer.
///
/// Calls arrive in order: `begin_output`, `query_text`, `print_plan`,
/// optionally `print_triggers`, then `end_output`, all against the same
/// [`ExplainState`].
pub trait PlanRenderer: Send + Sync {
    /// Open the document (e.g. the array wrapper in JSON).
    fn begin_output(&self, es: &mut ExplainState) -> ExecResult;

    /// Emit the statement text.
    fn query_text(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult;

    /// Emit the plan tree.
    fn print_plan(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult;

    /// Emit trigger statistics.
    fn print_triggers(&self, es: &mut ExplainState, desc: &QueryDesc) -> ExecResult;

    /// Close the document.
    fn end_output(&self, es: &mut ExplainState) -> ExecResult;
}
