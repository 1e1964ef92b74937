//! libdieroll: a single six-sided die as a rigid body, rolled on demand.
//!
//! - Cube rigid body with analytic inertia, launched from a fixed point with
//!   randomized linear and angular velocity
//! - Semi-implicit integration, face-clipping ground contacts, impulse solver
//!   with Coulomb friction, rolling resistance and sleep detection
//! - Contact onsets reported from `PhysicsWorld::step`
//! - `Idle`/`Rolling` state machine: trigger launches, first contact settles
//! - Six face labels ("1", "2", "3", "4", "Play", "Stop") placed in world
//!   space for rendering
//!
//! Public API:
//! - `SimConfig`: all tunables, serde-loadable, validated up front
//! - `Orchestrator::new(&config)?`, `press_roll()`, `frame(dt) -> RenderFrame`
//! - Lower level: `PhysicsWorld`, `RollStateMachine`, `FaceLayout`
//!
//! Example:
//! let mut orch = Orchestrator::new(&SimConfig::default())?;
//! orch.press_roll();
//! while orch.is_rolling() { draw(orch.frame(1.0 / 60.0)); }
//!
//! Which face ends up on top is left to whoever looks at the render.

pub mod body;
pub mod config;
pub mod error;
pub mod faces;
pub mod orchestrator;
pub mod roll;
pub mod world;

pub use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

pub use body::{Material, RigidBody};
pub use config::{DieConfig, FaceConfig, RollConfig, SimConfig, SolverConfig, WorldConfig};
pub use error::ConfigError;
pub use faces::{FaceLayout, FaceSlot, PlacedLabel, FACE_COUNT, FACE_LABELS};
pub use orchestrator::{Orchestrator, RenderFrame, RollControl};
pub use roll::{
    AxisSpans, LaunchRanges, LaunchSample, RelaunchPolicy, RollPhase, RollStateMachine,
    SettleGuard, SettleReason, Span, Transition, TriggerOutcome,
};
pub use world::{CollisionEvent, GroundPlane, PhysicsWorld};

pub type Real = f32;
const EPS: Real = 1e-6;
