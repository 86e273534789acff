//! Error types for auto_explain

use thiserror::Error;

/// Result type alias for executor phase calls.
pub type ExecResult<T = ()> = Result<T, ExecError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures raised while a statement is executing.
///
/// Hooks never translate these: whatever a delegated phase returns is handed
/// back to the caller as-is.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Statement canceled by the engine (user request, timeout, shutdown)
    #[error("canceling statement")]
    Canceled,

    /// Error raised by the executor itself
    #[error("Execution error: {0}")]
    Engine(String),

    /// Plan rendering failed
    #[error("Plan rendering error: {0}")]
    Render(String),

    /// The log sink rejected a record
    #[error("Log error: {0}")]
    Log(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl ExecError {
    /// Create an engine error
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }

    /// Create a rendering error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Check if this is a cancellation
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Errors raised when defining or assigning tunables.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// No tunable with this name exists
    #[error("unrecognized configuration parameter \"{0}\"")]
    UnknownSetting(String),

    /// Numeric value outside the declared bounds
    #[error("{value} is outside the valid range for parameter \"{name}\" ({min} .. {max})")]
    OutOfRange {
        name: String,
        value: String,
        min: String,
        max: String,
    },

    /// Value could not be parsed for the parameter's type
    #[error("parameter \"{name}\" requires a {expected} value, got \"{value}\"")]
    InvalidValue {
        name: String,
        value: String,
        expected: &'static str,
    },

    /// Enum value not among the declared options
    #[error("invalid value for parameter \"{name}\": \"{value}\" (available values: {options})")]
    InvalidEnum {
        name: String,
        value: String,
        options: String,
    },

    /// Caller lacks the privilege level required to change the parameter
    #[error("permission denied to set parameter \"{0}\"")]
    PermissionDenied(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            expected,
        }
    }

    /// Check if this is a privilege error
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
