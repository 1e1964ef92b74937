use std::fmt;

use crate::Real;

/// Configuration rejected when building a world. Raised at startup only;
/// nothing that runs per frame can produce one.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    NonPositiveMass(Real),
    DegenerateHalfExtent(Real),
    InvalidStep { field: &'static str, value: Real },
    InvalidSubstepCount,
    InvalidSolverIterations,
    NonFiniteGravity,
    InvalidLaunchRange { axis: &'static str, min: Real, max: Real },
    NonFiniteLaunchPoint,
    NonFiniteGroundHeight(Real),
    InvalidGroundExtent(Real),
    InvalidMaterial { field: &'static str, value: Real },
    InvalidLabelEpsilon(Real),
    InvalidSettleGuard(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveMass(m) => {
                write!(f, "die mass must be finite and > 0, got {}", m)
            }
            ConfigError::DegenerateHalfExtent(h) => {
                write!(f, "cube half-extent must be finite and > 0, got {}", h)
            }
            ConfigError::InvalidStep { field, value } => {
                write!(f, "{} must be finite and > 0, got {}", field, value)
            }
            ConfigError::InvalidSubstepCount => write!(f, "max_substeps must be at least 1"),
            ConfigError::InvalidSolverIterations => {
                write!(f, "solver iterations must be at least 1")
            }
            ConfigError::NonFiniteGravity => write!(f, "gravity must be a finite vector"),
            ConfigError::InvalidLaunchRange { axis, min, max } => write!(
                f,
                "launch range for {} must be finite with min <= max and a finite width, got [{}, {}]",
                axis, min, max
            ),
            ConfigError::NonFiniteLaunchPoint => write!(f, "launch point must be finite"),
            ConfigError::NonFiniteGroundHeight(y) => {
                write!(f, "ground height must be finite, got {}", y)
            }
            ConfigError::InvalidGroundExtent(e) => {
                write!(f, "ground half-extent must be finite and > 0, got {}", e)
            }
            ConfigError::InvalidMaterial { field, value } => {
                write!(f, "{} must be finite and >= 0, got {}", field, value)
            }
            ConfigError::InvalidLabelEpsilon(e) => {
                write!(f, "label epsilon must be finite and >= 0, got {}", e)
            }
            ConfigError::InvalidSettleGuard(why) => write!(f, "invalid settle guard: {}", why),
        }
    }
}

impl std::error::Error for ConfigError {}
