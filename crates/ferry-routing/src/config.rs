//! Router configuration
//!
//! Each router reads its own namespace of [`Settings`]; keys shared by all
//! routers live under `[Router]`. Values that would break a router's
//! invariants are rejected with [`ConfigError`], values that are merely
//! questionable show up in `validate()`.

use ferry_core::{ConfigError, Message, Settings};

/// Settings namespace of the geometric router
pub const GEOMETRIC_NS: &str = "GeometricRouter";
/// Settings namespace of the predictive router
pub const PROPHET_NS: &str = "ProphetRouter";
/// Settings namespace of the encounter-utility router
pub const ENCOUNTER_NS: &str = "EncounterRouter";
/// Settings namespace shared by every router
pub const ROUTER_NS: &str = "Router";

fn read_u32(settings: &Settings, namespace: &str, key: &str) -> Result<u32, ConfigError> {
    let value = settings.get_int(namespace, key)?;
    u32::try_from(value)
        .map_err(|_| ConfigError::invalid(namespace, key, format!("{value} is not a valid count")))
}

/// Settings common to every router
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterSettings {
    /// TTL stamped on newly created messages, in minutes
    pub msg_ttl: Option<u32>,
}

impl RouterSettings {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let msg_ttl = match settings.get_int_opt(ROUTER_NS, "msg_ttl")? {
            None => None,
            Some(v) if v > 0 => Some(read_u32(settings, ROUTER_NS, "msg_ttl")?),
            Some(v) => {
                return Err(ConfigError::invalid(
                    ROUTER_NS,
                    "msg_ttl",
                    format!("{v} must be positive"),
                ));
            }
        };
        Ok(Self { msg_ttl })
    }

    /// Apply the configured TTL to a new message
    pub fn stamp(&self, mut message: Message) -> Message {
        if self.msg_ttl.is_some() {
            message.ttl = self.msg_ttl;
        }
        message
    }
}

/// Geometric replication configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricConfig {
    /// Initial replica budget of each new message
    pub nrof_copies: u32,
}

impl Default for GeometricConfig {
    fn default() -> Self {
        Self { nrof_copies: 8 }
    }
}

impl GeometricConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            nrof_copies: read_u32(settings, GEOMETRIC_NS, "nrof_copies")?,
        })
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.nrof_copies == 0 {
            warnings.push(ConfigWarning::NoReplicaBudget);
        }
        warnings
    }
}

/// Predictive spray configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProphetConfig {
    /// Predictability credited on every direct encounter (P_init)
    pub initial_probability: f64,

    /// Aging multiplier applied per time unit (gamma)
    pub aging_constant: f64,

    /// Transitivity scaling (beta)
    /// Default: 0.25
    pub transitivity_constant: f64,

    /// Length of one aging time unit in seconds
    pub seconds_in_time_unit: u32,

    /// Initial replica budget of each new message
    pub nrof_copies: u32,

    /// Binary spraying splits the budget in half; otherwise one replica per hop
    pub binary_mode: bool,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        Self {
            initial_probability: 0.75,
            aging_constant: 0.98,
            transitivity_constant: 0.25,
            seconds_in_time_unit: 30,
            nrof_copies: 6,
            binary_mode: true,
        }
    }
}

impl ProphetConfig {
    /// Read the `[ProphetRouter]` namespace
    ///
    /// `seconds_in_time_unit`, `nrof_copies` and `binary_mode` are required;
    /// `beta` defaults to 0.25.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let seconds_in_time_unit = read_u32(settings, PROPHET_NS, "seconds_in_time_unit")?;
        if seconds_in_time_unit == 0 {
            return Err(ConfigError::invalid(
                PROPHET_NS,
                "seconds_in_time_unit",
                "must be positive",
            ));
        }

        let beta = settings.get_float_or(PROPHET_NS, "beta", defaults.transitivity_constant)?;
        if !(0.0..=1.0).contains(&beta) {
            return Err(ConfigError::invalid(
                PROPHET_NS,
                "beta",
                format!("{beta} outside [0, 1]"),
            ));
        }

        Ok(Self {
            transitivity_constant: beta,
            seconds_in_time_unit,
            nrof_copies: read_u32(settings, PROPHET_NS, "nrof_copies")?,
            binary_mode: settings.get_bool(PROPHET_NS, "binary_mode")?,
            ..defaults
        })
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.nrof_copies <= 1 {
            warnings.push(ConfigWarning::BudgetTooSmallToSpray);
        }
        if self.transitivity_constant == 0.0 {
            warnings.push(ConfigWarning::TransitivityDisabled);
        }
        warnings
    }
}

/// Encounter utility configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterConfig {
    /// Utility a peer must exceed to be a next hop
    pub threshold: f64,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl EncounterConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let threshold = settings.get_float_or(ENCOUNTER_NS, "threshold", Self::default().threshold)?;
        if threshold.is_nan() {
            return Err(ConfigError::invalid(ENCOUNTER_NS, "threshold", "not a number"));
        }
        Ok(Self { threshold })
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.threshold < 0.0 {
            warnings.push(ConfigWarning::NegativeThreshold);
        }
        warnings
    }
}

/// Configuration that is accepted but probably unintended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Geometric messages start with no replicas to give away
    NoReplicaBudget,
    /// Prophet only sprays messages holding more than one replica
    BudgetTooSmallToSpray,
    /// beta is zero, so transitive updates never change anything
    TransitivityDisabled,
    /// Every connected peer passes a negative utility threshold
    NegativeThreshold,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoReplicaBudget => {
                write!(f, "nrof_copies is 0; only FULL transfers will happen")
            }
            ConfigWarning::BudgetTooSmallToSpray => {
                write!(f, "nrof_copies <= 1; messages are never sprayed")
            }
            ConfigWarning::TransitivityDisabled => {
                write!(f, "beta is 0; transitive updates are disabled")
            }
            ConfigWarning::NegativeThreshold => {
                write!(f, "threshold is negative; every peer with a defined utility qualifies")
            }
        }
    }
}
