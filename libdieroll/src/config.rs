//! Simulation configuration.
//!
//! Every section deserializes with defaults filled in, so a JSON file only
//! needs the keys it wants to change. `validate` is the single gate for the
//! construction-time invariants; `PhysicsWorld::new` calls it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::roll::{LaunchRanges, RelaunchPolicy, SettleGuard};
use crate::Real;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub die: DieConfig,
    pub launch: LaunchRanges,
    pub solver: SolverConfig,
    pub faces: FaceConfig,
    pub roll: RollConfig,
}

/// Gravity and the static ground plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: [Real; 3],
    /// Height of the horizontal ground surface.
    pub ground_height: Real,
    /// Half size of the ground in X and Z; `None` is an infinite plane.
    pub ground_half_extent: Option<Real>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.8, 0.0],
            ground_height: -2.0,
            ground_half_extent: None,
        }
    }
}

/// Shape, mass and material of the die.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DieConfig {
    pub half_extent: Real,
    pub mass: Real,
    pub restitution: Real,
    pub static_friction: Real,
    pub dynamic_friction: Real,
    pub roll_resistance: Real,
}

impl Default for DieConfig {
    fn default() -> Self {
        Self {
            half_extent: 1.0,
            mass: 1.0,
            restitution: 0.25,
            static_friction: 0.6,
            dynamic_friction: 0.4,
            roll_resistance: 0.02,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Longest integration substep; a frame is split into equal substeps
    /// no longer than this.
    pub max_substep: Real,
    /// Upper bound on substeps per frame.
    pub max_substeps: u32,
    pub iterations: usize,
    pub sleep_linear: Real,
    pub sleep_angular: Real,
    pub sleep_time: Real,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_substep: 1.0 / 240.0,
            max_substeps: 64,
            iterations: 8,
            sleep_linear: 0.05,
            sleep_angular: 0.5,
            sleep_time: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Gap between the cube surface and its labels.
    pub label_epsilon: Real,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            label_epsilon: 0.01,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    pub relaunch: RelaunchPolicy,
    pub guard: SettleGuard,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let die = &self.die;
        if !(die.mass.is_finite() && die.mass > 0.0) {
            return Err(ConfigError::NonPositiveMass(die.mass));
        }
        if !(die.half_extent.is_finite() && die.half_extent > 0.0) {
            return Err(ConfigError::DegenerateHalfExtent(die.half_extent));
        }
        for (field, value) in [
            ("restitution", die.restitution),
            ("static_friction", die.static_friction),
            ("dynamic_friction", die.dynamic_friction),
            ("roll_resistance", die.roll_resistance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidMaterial { field, value });
            }
        }

        if self.world.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::NonFiniteGravity);
        }
        if !self.world.ground_height.is_finite() {
            return Err(ConfigError::NonFiniteGroundHeight(self.world.ground_height));
        }
        if let Some(extent) = self.world.ground_half_extent {
            if !(extent.is_finite() && extent > 0.0) {
                return Err(ConfigError::InvalidGroundExtent(extent));
            }
        }

        let solver = &self.solver;
        for (field, value) in [
            ("max_substep", solver.max_substep),
            ("sleep_linear", solver.sleep_linear),
            ("sleep_angular", solver.sleep_angular),
            ("sleep_time", solver.sleep_time),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidStep { field, value });
            }
        }
        if solver.max_substeps == 0 {
            return Err(ConfigError::InvalidSubstepCount);
        }
        if solver.iterations == 0 {
            return Err(ConfigError::InvalidSolverIterations);
        }

        let eps = self.faces.label_epsilon;
        if !(eps.is_finite() && eps >= 0.0) {
            return Err(ConfigError::InvalidLabelEpsilon(eps));
        }

        self.launch.validate()?;
        self.roll.guard.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.gravity, [0.0, -9.8, 0.0]);
        assert_eq!(config.die.mass, 1.0);
        assert_eq!(config.die.half_extent, 1.0);
        assert_eq!(config.launch.position, [0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_rejects_non_positive_mass() {
        for mass in [0.0, -1.0, Real::NAN] {
            let mut config = SimConfig::default();
            config.die.mass = mass;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::NonPositiveMass(_))
            ));
        }
    }

    #[test]
    fn test_rejects_degenerate_cube() {
        let mut config = SimConfig::default();
        config.die.half_extent = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DegenerateHalfExtent(0.0))
        );
    }

    #[test]
    fn test_rejects_bad_solver_and_world() {
        let mut config = SimConfig::default();
        config.solver.max_substep = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStep {
                field: "max_substep",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.solver.max_substeps = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSubstepCount));

        let mut config = SimConfig::default();
        config.world.gravity[1] = Real::INFINITY;
        assert_eq!(config.validate(), Err(ConfigError::NonFiniteGravity));

        let mut config = SimConfig::default();
        config.world.ground_half_extent = Some(-5.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidGroundExtent(-5.0))
        );

        let mut config = SimConfig::default();
        config.world.ground_height = Real::NAN;
        let err = config.validate().expect_err("NaN ground height");
        assert!(matches!(err, ConfigError::NonFiniteGroundHeight(_)));
        assert!(err.to_string().contains("ground height"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "die": { "mass": 2.5 }, "world": { "ground_half_extent": 5.0 } }"#;
        let config: SimConfig = serde_json::from_str(json).expect("parse config");
        assert_eq!(config.die.mass, 2.5);
        assert_eq!(config.die.half_extent, 1.0);
        assert_eq!(config.world.ground_half_extent, Some(5.0));
        assert_eq!(config.world.ground_height, -2.0);
        assert_eq!(config.roll.relaunch, RelaunchPolicy::OnTrigger);
        assert!(config.validate().is_ok());
    }
}
