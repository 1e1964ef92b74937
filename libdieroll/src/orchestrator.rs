//! Frame driver: the roll control, one physics step per frame, and the
//! snapshot a renderer needs.
//!
//! Everything runs on the caller's thread. A host that takes input on one
//! thread and renders on another should put the whole `Orchestrator` behind
//! one lock; it has no internal synchronization.

use log::trace;
use nalgebra::{Point3, UnitQuaternion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::faces::{FaceLayout, PlacedLabel};
use crate::roll::{RollStateMachine, Transition, TriggerOutcome};
use crate::world::{CollisionEvent, PhysicsWorld};
use crate::Real;

pub const CAPTION_IDLE: &str = "Roll";
pub const CAPTION_ROLLING: &str = "Rolling...";

/// State of the user-facing roll control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollControl {
    pub enabled: bool,
    pub caption: &'static str,
}

/// What the renderer draws for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    /// Simulation time after this frame.
    pub time: Real,
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub labels: Vec<PlacedLabel>,
    pub is_rolling: bool,
    pub control: RollControl,
    /// Contact onsets seen this frame.
    pub collisions: usize,
    /// First state change this frame, if any.
    pub transition: Transition,
}

pub struct Orchestrator<R = StdRng> {
    world: PhysicsWorld,
    roll: RollStateMachine,
    layout: FaceLayout,
    rng: R,
    frames: u64,
}

impl Orchestrator<StdRng> {
    /// Orchestrator with an OS-seeded generator.
    pub fn new(config: &SimConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> Orchestrator<R> {
    pub fn with_rng(config: &SimConfig, rng: R) -> Result<Self, ConfigError> {
        let world = PhysicsWorld::new(config)?;
        let roll = RollStateMachine::new(
            config.launch.clone(),
            config.roll.relaunch,
            config.roll.guard.clone(),
        )?;
        let layout = FaceLayout::new(config.die.half_extent, config.faces.label_epsilon);
        Ok(Self {
            world,
            roll,
            layout,
            rng,
            frames: 0,
        })
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn roll_state(&self) -> &RollStateMachine {
        &self.roll
    }

    pub fn layout(&self) -> &FaceLayout {
        &self.layout
    }

    pub fn is_rolling(&self) -> bool {
        self.roll.is_rolling()
    }

    /// Frames driven so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn control(&self) -> RollControl {
        if self.is_rolling() {
            RollControl {
                enabled: false,
                caption: CAPTION_ROLLING,
            }
        } else {
            RollControl {
                enabled: true,
                caption: CAPTION_IDLE,
            }
        }
    }

    /// The roll button. Does nothing while the control is disabled.
    pub fn press_roll(&mut self) -> TriggerOutcome {
        if !self.control().enabled {
            return TriggerOutcome::Ignored;
        }
        self.roll.trigger(&mut self.world, &mut self.rng)
    }

    /// Feed a contact onset from outside the world's own step.
    pub fn inject_collision(&mut self, event: &CollisionEvent) -> Transition {
        self.roll.on_collision(event)
    }

    /// Advance one animation frame and return what to draw.
    pub fn frame(&mut self, dt: Real) -> RenderFrame {
        self.roll.before_step(&mut self.world, &mut self.rng);

        let events = self.world.step(dt);
        let mut transition = Transition::None;
        for event in &events {
            let t = self.roll.on_collision(event);
            if transition == Transition::None {
                transition = t;
            }
        }
        let guarded = self.roll.after_step(&self.world, dt);
        if transition == Transition::None {
            transition = guarded;
        }

        self.frames += 1;
        let mut frame = self.snapshot();
        frame.collisions = events.len();
        frame.transition = transition;
        trace!(
            "frame {}: rolling={} pos={:?}",
            self.frames,
            frame.is_rolling,
            frame.position
        );
        frame
    }

    /// Current pose and control state without stepping.
    pub fn snapshot(&self) -> RenderFrame {
        let body = self.world.body();
        RenderFrame {
            time: self.world.elapsed(),
            position: *body.position(),
            orientation: *body.orientation(),
            labels: self.layout.render_faces(&body.pose()),
            is_rolling: self.is_rolling(),
            control: self.control(),
            collisions: 0,
            transition: Transition::None,
        }
    }
}
