//! The die's rigid body and its controller overrides.
//!
//! Overrides (`reset_pose`, `set_velocity`, `set_angular_velocity`) are
//! teleports, not forces: they replace state outright and take effect before
//! the next integration step reads it.

use nalgebra::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::config::DieConfig;
use crate::{Real, EPS};

/// Cube faces as vertex indices into [`RigidBody::local_vertices`],
/// CCW when viewed from outside.
pub(crate) const CUBE_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3], // -Z
    [4, 7, 6, 5], // +Z
    [0, 4, 5, 1], // -Y
    [2, 6, 7, 3], // +Y
    [1, 5, 6, 2], // +X
    [0, 3, 7, 4], // -X
];

/// Contact material of the die against the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub restitution: Real,
    pub static_friction: Real,
    pub dynamic_friction: Real,
    pub roll_resistance: Real,
}

impl From<&DieConfig> for Material {
    fn from(die: &DieConfig) -> Self {
        Self {
            restitution: die.restitution,
            static_friction: die.static_friction,
            dynamic_friction: die.dynamic_friction,
            roll_resistance: die.roll_resistance,
        }
    }
}

/// Rigid-body data for a solid cube: mass, inverse inertia in body space,
/// and state. Mass and shape are fixed at construction.
#[derive(Clone, Debug)]
pub struct RigidBody {
    mass: Real,
    inv_mass: Real,
    inv_inertia_body: Matrix3<Real>,
    half_extent: Real,
    material: Material,

    // state
    pub(crate) position: Point3<Real>,
    pub(crate) orientation: UnitQuaternion<Real>,
    pub(crate) velocity: Vector3<Real>,
    pub(crate) angular_velocity: Vector3<Real>,
}

impl RigidBody {
    /// Solid cube of side `2 * half_extent`. Callers validate `mass` and
    /// `half_extent` first (see `SimConfig::validate`).
    pub(crate) fn cube(half_extent: Real, mass: Real, material: Material) -> Self {
        // I = m * side^2 / 6 about every principal axis
        let inertia = mass * (2.0 * half_extent).powi(2) / 6.0;
        Self {
            mass,
            inv_mass: 1.0 / mass.max(EPS),
            inv_inertia_body: Matrix3::identity() * (1.0 / inertia.max(EPS)),
            half_extent,
            material,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    pub fn mass(&self) -> Real {
        self.mass
    }

    pub fn inv_mass(&self) -> Real {
        self.inv_mass
    }

    pub fn half_extent(&self) -> Real {
        self.half_extent
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn position(&self) -> &Point3<Real> {
        &self.position
    }

    pub fn orientation(&self) -> &UnitQuaternion<Real> {
        &self.orientation
    }

    pub fn velocity(&self) -> &Vector3<Real> {
        &self.velocity
    }

    pub fn angular_velocity(&self) -> &Vector3<Real> {
        &self.angular_velocity
    }

    /// World transform of the body, for rendering.
    pub fn pose(&self) -> Isometry3<Real> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
    }

    /// Teleport to `position` with identity orientation.
    pub fn reset_pose(&mut self, position: Point3<Real>) {
        self.position = position;
        self.orientation = UnitQuaternion::identity();
    }

    pub fn set_velocity(&mut self, v: Vector3<Real>) {
        self.velocity = v;
    }

    pub fn set_angular_velocity(&mut self, w: Vector3<Real>) {
        self.angular_velocity = w;
    }

    /// Corner positions in body space, indexed as in `CUBE_FACES`.
    pub fn local_vertices(&self) -> [Point3<Real>; 8] {
        let h = self.half_extent;
        [
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ]
    }

    /// Corner positions in world space.
    pub fn vertices_world(&self) -> [Point3<Real>; 8] {
        let r = self.orientation.to_rotation_matrix();
        self.local_vertices()
            .map(|p| self.position + r * p.coords)
    }

    pub(crate) fn inv_inertia_world(&self) -> Matrix3<Real> {
        let binding = self.orientation.to_rotation_matrix();
        let r = binding.matrix();
        r * self.inv_inertia_body * r.transpose()
    }

    pub(crate) fn apply_impulse_at_point(&mut self, impulse: Vector3<Real>, contact_r: Vector3<Real>) {
        self.velocity += impulse * self.inv_mass;
        let inv_iw = self.inv_inertia_world();
        self.angular_velocity += inv_iw * contact_r.cross(&impulse);
    }

    /// Velocity of a point attached to the body at offset `r` from its center.
    pub(crate) fn point_velocity(&self, r: &Vector3<Real>) -> Vector3<Real> {
        self.velocity + self.angular_velocity.cross(r)
    }
}
