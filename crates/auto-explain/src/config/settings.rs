use super::tunables::{ConfigRegistry, TunableDef, TunableKey, TunableKind, Unit, find_tunable};
use super::{ExplainConfig, NAMESPACE, Privilege};
use crate::error::{ConfigError, ConfigResult};
use crate::explain::ExplainFormat;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct State {
    config: ExplainConfig,
    /// Namespaced values supplied before their tunable was defined.
    placeholders: BTreeMap<String, String>,
}

/// Shared store of current tunable values.
///
/// Writers go through [`set`](Self::set) / [`reset`](Self::reset), which
/// validate against [`TUNABLES`](super::TUNABLES) and enforce the required
/// privilege. The hooks read a [`snapshot`](Self::snapshot) once per phase.
#[derive(Debug, Default)]
pub struct Settings {
    state: RwLock<State>,
}

impl Settings {
    /// Create a store holding the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `config`.
    pub fn with_config(config: ExplainConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(State {
                config,
                placeholders: BTreeMap::new(),
            }),
        })
    }

    /// Create a store from raw `name = value` pairs, e.g. a server config
    /// file read before the extension is loaded.
    ///
    /// Names under the `auto_explain` namespace are held as placeholders
    /// until [`define`](ConfigRegistry::define) adopts them. Other names
    /// belong to someone else and are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = format!("{NAMESPACE}.");
        let placeholders = pairs
            .into_iter()
            .filter_map(|(name, value)| {
                let name = name.as_ref().trim().to_ascii_lowercase();
                name.starts_with(&prefix).then(|| (name, value.into()))
            })
            .collect();
        Self {
            state: RwLock::new(State {
                config: ExplainConfig::default(),
                placeholders,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> ExplainConfig {
        self.read().config
    }

    /// Replace every value at once.
    pub fn replace(&self, config: ExplainConfig) -> ConfigResult<()> {
        config.validate()?;
        self.write().config = config;
        Ok(())
    }

    /// Assign one tunable from its textual form.
    pub fn set(&self, name: &str, value: &str, privilege: Privilege) -> ConfigResult<()> {
        let def = lookup(name)?;
        if privilege < def.context {
            return Err(ConfigError::PermissionDenied(def.name.to_string()));
        }
        let mut state = self.write();
        apply(&mut state.config, def, value)
    }

    /// Restore one tunable to its default.
    pub fn reset(&self, name: &str, privilege: Privilege) -> ConfigResult<()> {
        let def = lookup(name)?;
        if privilege < def.context {
            return Err(ConfigError::PermissionDenied(def.name.to_string()));
        }
        let defaults = ExplainConfig::default();
        let mut state = self.write();
        let config = &mut state.config;
        match def.key {
            TunableKey::LogMinDuration => config.log_min_duration = defaults.log_min_duration,
            TunableKey::LogFormat => config.log_format = defaults.log_format,
            TunableKey::SampleRate => config.sample_rate = defaults.sample_rate,
            key => {
                if let (Some(field), Some(default)) =
                    (key.bool_field_mut(config), key.bool_value(&defaults))
                {
                    *field = default;
                }
            }
        }
        Ok(())
    }

    /// Current value of one tunable in its display form.
    pub fn show(&self, name: &str) -> ConfigResult<String> {
        let def = lookup(name)?;
        let config = self.snapshot();
        Ok(match def.key {
            TunableKey::LogMinDuration if config.log_min_duration < 0 => {
                config.log_min_duration.to_string()
            }
            TunableKey::LogMinDuration => format!("{}ms", config.log_min_duration),
            TunableKey::LogFormat => config.log_format.to_string(),
            TunableKey::SampleRate => config.sample_rate.to_string(),
            key => match key.bool_value(&config) {
                Some(true) => "on".to_string(),
                _ => "off".to_string(),
            },
        })
    }

    /// Names of placeholders that no definition has adopted.
    pub fn placeholders(&self) -> Vec<String> {
        self.read().placeholders.keys().cloned().collect()
    }
}

impl ConfigRegistry for Settings {
    fn define(&self, def: &'static TunableDef) {
        let mut state = self.write();
        let Some(value) = state.placeholders.remove(def.name) else {
            return;
        };
        if let Err(err) = apply(&mut state.config, def, &value) {
            tracing::warn!(
                target: "auto_explain",
                parameter = def.name,
                %err,
                "ignoring invalid setting"
            );
        }
    }

    fn emit_warnings_on_placeholders(&self, prefix: &str) {
        let prefix = format!("{prefix}.");
        for name in self.read().placeholders.keys() {
            if name.starts_with(&prefix) {
                tracing::warn!(
                    target: "auto_explain",
                    parameter = %name,
                    "unrecognized configuration parameter \"{name}\""
                );
            }
        }
    }
}

fn lookup(name: &str) -> ConfigResult<&'static TunableDef> {
    find_tunable(name).ok_or_else(|| ConfigError::UnknownSetting(name.to_string()))
}

fn apply(config: &mut ExplainConfig, def: &TunableDef, value: &str) -> ConfigResult<()> {
    match def.key {
        TunableKey::LogMinDuration => config.log_min_duration = parse_int(def, value)?,
        TunableKey::SampleRate => config.sample_rate = parse_real(def, value)?,
        TunableKey::LogFormat => config.log_format = parse_enum(def, value)?,
        key => {
            let on = parse_bool(value)
                .ok_or_else(|| ConfigError::invalid_value(def.name, value, def.kind.type_name()))?;
            if let Some(field) = key.bool_field_mut(config) {
                *field = on;
            }
        }
    }
    Ok(())
}

fn parse_int(def: &TunableDef, value: &str) -> ConfigResult<i32> {
    let TunableKind::Int { min, max, .. } = def.kind else {
        return Err(ConfigError::invalid_value(def.name, value, def.kind.type_name()));
    };
    let invalid = || ConfigError::invalid_value(def.name, value, def.kind.type_name());

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number.trim().parse().map_err(|_| invalid())?;

    let multiplier = match (def.unit, unit.trim()) {
        (_, "") => 1.0,
        (Unit::Milliseconds, "ms") => 1.0,
        (Unit::Milliseconds, "s") => 1_000.0,
        (Unit::Milliseconds, "min") => 60_000.0,
        (Unit::Milliseconds, "h") => 3_600_000.0,
        (Unit::Milliseconds, "d") => 86_400_000.0,
        _ => return Err(invalid()),
    };

    let scaled = (number * multiplier).round();
    if !scaled.is_finite() || scaled < f64::from(min) || scaled > f64::from(max) {
        return Err(ConfigError::OutOfRange {
            name: def.name.to_string(),
            value: trimmed.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(scaled as i32)
}

fn parse_real(def: &TunableDef, value: &str) -> ConfigResult<f64> {
    let TunableKind::Real { min, max, .. } = def.kind else {
        return Err(ConfigError::invalid_value(def.name, value, def.kind.type_name()));
    };
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(def.name, value, def.kind.type_name()))?;
    if parsed.is_nan() || parsed < min || parsed > max {
        return Err(ConfigError::OutOfRange {
            name: def.name.to_string(),
            value: value.trim().to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(parsed)
}

fn parse_enum(def: &TunableDef, value: &str) -> ConfigResult<ExplainFormat> {
    let TunableKind::Enum { options, .. } = def.kind else {
        return Err(ConfigError::invalid_value(def.name, value, def.kind.type_name()));
    };
    value.parse().map_err(|_| ConfigError::InvalidEnum {
        name: def.name.to_string(),
        value: value.to_string(),
        options: options.join(", "),
    })
}

/// Accepts `on/off`, `1/0` and any unambiguous prefix of
/// `true/false/yes/no`.
fn parse_bool(value: &str) -> Option<bool> {
    let v = value.trim().to_ascii_lowercase();
    if v.is_empty() {
        return None;
    }
    match v.as_str() {
        "1" | "on" => return Some(true),
        "0" | "of" | "off" => return Some(false),
        _ => {}
    }
    if "true".starts_with(&v) || "yes".starts_with(&v) {
        Some(true)
    } else if "false".starts_with(&v) || "no".starts_with(&v) {
        Some(false)
    } else {
        None
    }
}
