use super::{ExplainConfig, Privilege};

/// Prefix shared by every tunable name.
pub const NAMESPACE: &str = "auto_explain";

/// Upper bound of `log_min_duration`, so the value still fits in
/// microseconds.
pub const MAX_MIN_DURATION_MS: i32 = i32::MAX / 1000;

/// Unit attached to an integer tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Milliseconds,
}

/// Type, default and bounds of a tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TunableKind {
    Int { default: i32, min: i32, max: i32 },
    Bool { default: bool },
    Real { default: f64, min: f64, max: f64 },
    Enum {
        default: &'static str,
        options: &'static [&'static str],
    },
}

impl TunableKind {
    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int { .. } => "integer",
            Self::Bool { .. } => "Boolean",
            Self::Real { .. } => "numeric",
            Self::Enum { .. } => "enumerated",
        }
    }
}

/// Which [`ExplainConfig`] field a tunable maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunableKey {
    LogMinDuration,
    LogAnalyze,
    LogVerbose,
    LogBuffers,
    LogTriggers,
    LogFormat,
    LogNestedStatements,
    LogTiming,
    SampleRate,
}

impl TunableKey {
    /// Current value of a boolean tunable; `None` for the other kinds.
    pub(crate) fn bool_value(self, config: &ExplainConfig) -> Option<bool> {
        match self {
            Self::LogAnalyze => Some(config.log_analyze),
            Self::LogVerbose => Some(config.log_verbose),
            Self::LogBuffers => Some(config.log_buffers),
            Self::LogTriggers => Some(config.log_triggers),
            Self::LogNestedStatements => Some(config.log_nested_statements),
            Self::LogTiming => Some(config.log_timing),
            Self::LogMinDuration | Self::LogFormat | Self::SampleRate => None,
        }
    }

    pub(crate) fn bool_field_mut(self, config: &mut ExplainConfig) -> Option<&mut bool> {
        match self {
            Self::LogAnalyze => Some(&mut config.log_analyze),
            Self::LogVerbose => Some(&mut config.log_verbose),
            Self::LogBuffers => Some(&mut config.log_buffers),
            Self::LogTriggers => Some(&mut config.log_triggers),
            Self::LogNestedStatements => Some(&mut config.log_nested_statements),
            Self::LogTiming => Some(&mut config.log_timing),
            Self::LogMinDuration | Self::LogFormat | Self::SampleRate => None,
        }
    }
}

/// Definition of one tunable as registered with the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunableDef {
    /// Fully qualified name, `auto_explain.<key>`.
    pub name: &'static str,
    pub key: TunableKey,
    pub short_desc: &'static str,
    pub long_desc: Option<&'static str>,
    pub kind: TunableKind,
    pub unit: Unit,
    /// Privilege required to change the value.
    pub context: Privilege,
}

const FORMAT_OPTIONS: &[&str] = &["text", "xml", "json", "yaml"];

/// Every tunable, in registration order.
pub static TUNABLES: [TunableDef; 9] = [
    TunableDef {
        name: "auto_explain.log_min_duration",
        key: TunableKey::LogMinDuration,
        short_desc: "Sets the minimum execution time above which plans will be logged.",
        long_desc: Some("Zero prints all plans. -1 turns this feature off."),
        kind: TunableKind::Int {
            default: -1,
            min: -1,
            max: MAX_MIN_DURATION_MS,
        },
        unit: Unit::Milliseconds,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_analyze",
        key: TunableKey::LogAnalyze,
        short_desc: "Use EXPLAIN ANALYZE for plan logging.",
        long_desc: None,
        kind: TunableKind::Bool { default: false },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_verbose",
        key: TunableKey::LogVerbose,
        short_desc: "Use EXPLAIN VERBOSE for plan logging.",
        long_desc: None,
        kind: TunableKind::Bool { default: false },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_buffers",
        key: TunableKey::LogBuffers,
        short_desc: "Log buffers usage.",
        long_desc: None,
        kind: TunableKind::Bool { default: false },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_triggers",
        key: TunableKey::LogTriggers,
        short_desc: "Include trigger statistics in plans.",
        long_desc: Some("This has no effect unless log_analyze is also set."),
        kind: TunableKind::Bool { default: false },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_format",
        key: TunableKey::LogFormat,
        short_desc: "EXPLAIN format to be used for plan logging.",
        long_desc: None,
        kind: TunableKind::Enum {
            default: "text",
            options: FORMAT_OPTIONS,
        },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_nested_statements",
        key: TunableKey::LogNestedStatements,
        short_desc: "Log nested statements.",
        long_desc: None,
        kind: TunableKind::Bool { default: false },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.log_timing",
        key: TunableKey::LogTiming,
        short_desc: "Collect timing data, not just row counts.",
        long_desc: None,
        kind: TunableKind::Bool { default: true },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
    TunableDef {
        name: "auto_explain.sample_rate",
        key: TunableKey::SampleRate,
        short_desc: "Fraction of queries to process.",
        long_desc: None,
        kind: TunableKind::Real {
            default: 1.0,
            min: 0.0,
            max: 1.0,
        },
        unit: Unit::None,
        context: Privilege::Superuser,
    },
];

/// Look up a definition by fully qualified name, case-insensitively.
pub fn find_tunable(name: &str) -> Option<&'static TunableDef> {
    TUNABLES
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(name.trim()))
}

/// The host's configuration subsystem.
pub trait ConfigRegistry {
    /// Declare one tunable.
    fn define(&self, def: &'static TunableDef);

    /// Warn about names under `prefix` that were set but never defined.
    fn emit_warnings_on_placeholders(&self, prefix: &str);
}

/// Define every tunable, then flag leftover placeholders in the namespace.
pub fn register_tunables(registry: &dyn ConfigRegistry) {
    for def in &TUNABLES {
        registry.define(def);
    }
    registry.emit_warnings_on_placeholders(NAMESPACE);
}
