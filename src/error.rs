use thiserror::Error;

/// Construction-time configuration problems. These are programmer or profile
/// errors, never runtime data conditions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("threshold for '{gesture}' must be a finite value in [0, 1], got {value}")]
    InvalidThreshold { gesture: &'static str, value: f32 },

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("unknown gesture '{0}'")]
    UnknownGesture(String),

    #[error("binding '{key}' has invalid action '{action}'")]
    InvalidBinding { key: String, action: String },
}
