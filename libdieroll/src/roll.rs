//! Roll state machine: `Idle` and `Rolling`.
//!
//! A trigger while idle teleports the die to the launch point and injects
//! freshly sampled velocities before anything else reads the body. The
//! first collision while rolling returns to idle; everything else is
//! ignored.

use log::{debug, info};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::{CollisionEvent, PhysicsWorld};
use crate::Real;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RollPhase {
    #[default]
    Idle,
    Rolling,
}

/// Closed interval sampled uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: Real,
    pub max: Real,
}

impl Span {
    pub const fn new(min: Real, max: Real) -> Self {
        Self { min, max }
    }

    /// Symmetric interval `[-half, half]`.
    pub fn centered(half: Real) -> Self {
        Self::new(-half, half)
    }

    pub fn contains(&self, v: Real) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        // the sampler scales the width by 1 / (1 - EPSILON); that must stay finite
        let scaled = (self.max - self.min) / (1.0 - Real::EPSILON);
        if self.min <= self.max && scaled.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::InvalidLaunchRange {
                axis,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisSpans {
    pub x: Span,
    pub y: Span,
    pub z: Span,
}

impl AxisSpans {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<Real> {
        Vector3::new(self.x.sample(rng), self.y.sample(rng), self.z.sample(rng))
    }

    pub fn contains(&self, v: &Vector3<Real>) -> bool {
        self.x.contains(v.x) && self.y.contains(v.y) && self.z.contains(v.z)
    }
}

/// Where a roll starts and the ranges its velocities are drawn from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchRanges {
    pub position: [Real; 3],
    pub linear: AxisSpans,
    pub angular: AxisSpans,
}

impl Default for LaunchRanges {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 0.0],
            // the upward component always beats gravity
            linear: AxisSpans {
                x: Span::centered(1.0),
                y: Span::new(2.0, 7.0),
                z: Span::centered(1.0),
            },
            angular: AxisSpans {
                x: Span::centered(3.5),
                y: Span::centered(2.5),
                z: Span::centered(2.5),
            },
        }
    }
}

impl LaunchRanges {
    pub fn launch_point(&self) -> Point3<Real> {
        let [x, y, z] = self.position;
        Point3::new(x, y, z)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> LaunchSample {
        LaunchSample {
            velocity: self.linear.sample(rng),
            angular_velocity: self.angular.sample(rng),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.position.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::NonFiniteLaunchPoint);
        }
        self.linear.x.validate("linear.x")?;
        self.linear.y.validate("linear.y")?;
        self.linear.z.validate("linear.z")?;
        self.angular.x.validate("angular.x")?;
        self.angular.y.validate("angular.y")?;
        self.angular.z.validate("angular.z")
    }
}

/// Velocities injected by one launch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchSample {
    pub velocity: Vector3<Real>,
    pub angular_velocity: Vector3<Real>,
}

/// When launch velocities are applied while rolling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaunchPolicy {
    /// Once, on the `Idle -> Rolling` edge.
    #[default]
    OnTrigger,
    /// Teleport and resample before every frame while rolling. The die never
    /// gets far from the launch point in this mode.
    EveryFrame,
}

/// Optional forced settle. Both checks are off by default, in which case a
/// die that never touches the ground stays rolling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleGuard {
    /// Give up after this many seconds rolling.
    pub max_roll_time: Option<Real>,
    /// Settle once linear and angular speed stay below this...
    pub rest_speed: Option<Real>,
    /// ...for this many seconds.
    pub rest_time: Real,
}

impl Default for SettleGuard {
    fn default() -> Self {
        Self {
            max_roll_time: None,
            rest_speed: None,
            rest_time: 0.5,
        }
    }
}

impl SettleGuard {
    pub fn is_enabled(&self) -> bool {
        self.max_roll_time.is_some() || self.rest_speed.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.max_roll_time {
            if !(t.is_finite() && t > 0.0) {
                return Err(ConfigError::InvalidSettleGuard("max_roll_time must be > 0"));
            }
        }
        if let Some(s) = self.rest_speed {
            if !(s.is_finite() && s > 0.0) {
                return Err(ConfigError::InvalidSettleGuard("rest_speed must be > 0"));
            }
        }
        if !(self.rest_time.is_finite() && self.rest_time >= 0.0) {
            return Err(ConfigError::InvalidSettleGuard("rest_time must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriggerOutcome {
    Launched(LaunchSample),
    /// Already rolling; nothing changed.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleReason {
    Collision,
    Timeout,
    AtRest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transition {
    #[default]
    None,
    ToIdle(SettleReason),
}

pub struct RollStateMachine {
    phase: RollPhase,
    ranges: LaunchRanges,
    relaunch: RelaunchPolicy,
    guard: SettleGuard,
    rolling_time: Real,
    rest_accum: Real,
    last_launch: Option<LaunchSample>,
}

impl RollStateMachine {
    /// Rejects ranges or guard settings that could fail once a roll starts.
    pub fn new(
        ranges: LaunchRanges,
        relaunch: RelaunchPolicy,
        guard: SettleGuard,
    ) -> Result<Self, ConfigError> {
        ranges.validate()?;
        guard.validate()?;
        Ok(Self {
            phase: RollPhase::Idle,
            ranges,
            relaunch,
            guard,
            rolling_time: 0.0,
            rest_accum: 0.0,
            last_launch: None,
        })
    }

    pub fn phase(&self) -> RollPhase {
        self.phase
    }

    pub fn is_rolling(&self) -> bool {
        self.phase == RollPhase::Rolling
    }

    pub fn ranges(&self) -> &LaunchRanges {
        &self.ranges
    }

    pub fn relaunch(&self) -> RelaunchPolicy {
        self.relaunch
    }

    /// Seconds spent in the current (or last) roll.
    pub fn rolling_time(&self) -> Real {
        self.rolling_time
    }

    pub fn last_launch(&self) -> Option<&LaunchSample> {
        self.last_launch.as_ref()
    }

    /// `Idle -> Rolling`. The body is reset and launched before this
    /// returns, so the next step integrates the new state.
    pub fn trigger<R: Rng + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        rng: &mut R,
    ) -> TriggerOutcome {
        if self.is_rolling() {
            debug!("roll trigger ignored, die already rolling");
            return TriggerOutcome::Ignored;
        }
        self.phase = RollPhase::Rolling;
        self.rolling_time = 0.0;
        self.rest_accum = 0.0;
        let sample = self.launch(world, rng);
        info!(
            "rolling: v = {:?}, w = {:?}",
            sample.velocity, sample.angular_velocity
        );
        TriggerOutcome::Launched(sample)
    }

    /// `Rolling -> Idle` on the first contact; a no-op while idle.
    pub fn on_collision(&mut self, event: &CollisionEvent) -> Transition {
        if !self.is_rolling() {
            debug!("collision at t={:.3}s while idle, ignored", event.time);
            return Transition::None;
        }
        self.settle(SettleReason::Collision)
    }

    /// Run before each frame's integration.
    pub fn before_step<R: Rng + ?Sized>(&mut self, world: &mut PhysicsWorld, rng: &mut R) {
        if self.is_rolling() && self.relaunch == RelaunchPolicy::EveryFrame {
            self.launch(world, rng);
        }
    }

    /// Run after each frame's integration and collision dispatch. Only the
    /// settle guard can act here.
    pub fn after_step(&mut self, world: &PhysicsWorld, dt: Real) -> Transition {
        if !self.is_rolling() || !dt.is_finite() || dt <= 0.0 {
            return Transition::None;
        }
        self.rolling_time += dt;

        if let Some(max) = self.guard.max_roll_time {
            if self.rolling_time >= max {
                return self.settle(SettleReason::Timeout);
            }
        }

        if let Some(speed) = self.guard.rest_speed {
            let body = world.body();
            if body.velocity().norm() < speed && body.angular_velocity().norm() < speed {
                self.rest_accum += dt;
            } else {
                self.rest_accum = 0.0;
            }
            if self.rest_accum >= self.guard.rest_time {
                return self.settle(SettleReason::AtRest);
            }
        }
        Transition::None
    }

    fn launch<R: Rng + ?Sized>(&mut self, world: &mut PhysicsWorld, rng: &mut R) -> LaunchSample {
        let sample = self.ranges.sample(rng);
        world.reset_pose(self.ranges.launch_point());
        world.set_velocity(sample.velocity);
        world.set_angular_velocity(sample.angular_velocity);
        self.last_launch = Some(sample);
        sample
    }

    fn settle(&mut self, reason: SettleReason) -> Transition {
        self.phase = RollPhase::Idle;
        self.rest_accum = 0.0;
        info!(
            "roll finished after {:.3}s ({:?})",
            self.rolling_time, reason
        );
        Transition::ToIdle(reason)
    }
}
