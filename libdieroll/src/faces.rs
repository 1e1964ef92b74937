//! Label placement on the six cube faces.

use std::f32::consts::{FRAC_PI_2, PI};

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::Real;

pub const FACE_COUNT: usize = 6;

/// Face labels in slot order. Not pip values.
pub const FACE_LABELS: [&str; FACE_COUNT] = ["1", "2", "3", "4", "Play", "Stop"];

/// Outward normal and XYZ Euler rotation of each slot. The rotation turns a
/// flat label facing +Z to face along the normal.
const SLOT_AXES: [([Real; 3], [Real; 3]); FACE_COUNT] = [
    ([0.0, 0.0, 1.0], [0.0, 0.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, PI, 0.0]),
    ([0.0, 1.0, 0.0], [-FRAC_PI_2, 0.0, 0.0]),
    ([0.0, -1.0, 0.0], [FRAC_PI_2, 0.0, 0.0]),
    ([1.0, 0.0, 0.0], [0.0, FRAC_PI_2, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -FRAC_PI_2, 0.0]),
];

/// Rotation from intrinsic X, then Y, then Z Euler angles.
fn euler_xyz([x, y, z]: [Real; 3]) -> UnitQuaternion<Real> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
}

/// One label placement in the die's local frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceSlot {
    index: usize,
    label: &'static str,
    local_offset: Vector3<Real>,
    local_orientation: UnitQuaternion<Real>,
}

impl FaceSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn local_offset(&self) -> &Vector3<Real> {
        &self.local_offset
    }

    pub fn local_orientation(&self) -> &UnitQuaternion<Real> {
        &self.local_orientation
    }

    /// The label's facing direction in the die's frame.
    pub fn outward_normal(&self) -> Vector3<Real> {
        self.local_orientation * Vector3::z()
    }

    pub fn local_transform(&self) -> Isometry3<Real> {
        Isometry3::from_parts(Translation3::from(self.local_offset), self.local_orientation)
    }
}

/// A label placed in world space for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLabel {
    pub index: usize,
    pub label: &'static str,
    pub position: Point3<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub normal: Vector3<Real>,
}

/// The six fixed face slots of a cube.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLayout {
    slots: [FaceSlot; FACE_COUNT],
}

impl FaceLayout {
    /// Slots sit `epsilon` outside the surface of a cube with the given
    /// half-extent.
    pub fn new(half_extent: Real, epsilon: Real) -> Self {
        let distance = half_extent + epsilon;
        let slots = std::array::from_fn(|index| {
            let ([nx, ny, nz], euler) = SLOT_AXES[index];
            FaceSlot {
                index,
                label: FACE_LABELS[index],
                local_offset: Vector3::new(nx, ny, nz) * distance,
                local_orientation: euler_xyz(euler),
            }
        });
        Self { slots }
    }

    pub fn slots(&self) -> &[FaceSlot; FACE_COUNT] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&FaceSlot> {
        self.slots.get(index)
    }

    /// Compose the body's world transform with every slot.
    pub fn render_faces(&self, body: &Isometry3<Real>) -> Vec<PlacedLabel> {
        self.slots
            .iter()
            .map(|slot| {
                let world = body * slot.local_transform();
                PlacedLabel {
                    index: slot.index,
                    label: slot.label,
                    position: Point3::from(world.translation.vector),
                    orientation: world.rotation,
                    normal: world.rotation * Vector3::z(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Real = 1e-5;

    fn layout() -> FaceLayout {
        FaceLayout::new(1.0, 0.01)
    }

    #[test]
    fn test_labels_in_slot_order() {
        let labels: Vec<&str> = layout().slots().iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4", "Play", "Stop"]);
        assert!(layout().slot(6).is_none());
        assert_eq!(layout().slot(4).map(|s| s.label()), Some("Play"));
    }

    #[test]
    fn test_each_slot_sits_on_one_axis_facing_out() {
        let layout = layout();
        let mut seen = Vec::new();
        for slot in layout.slots() {
            let offset = slot.local_offset();
            let (axis, component) = (0..3)
                .map(|i| (i, offset[i]))
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                .expect("three components");
            assert!((component.abs() - 1.01).abs() < TOL);
            for other in (0..3).filter(|&i| i != axis) {
                assert!(offset[other].abs() < TOL);
            }

            let normal = slot.outward_normal();
            assert!((normal[axis] - component.signum()).abs() < TOL, "slot {}", slot.index());
            assert!((normal.norm() - 1.0).abs() < TOL);

            seen.push((axis, component > 0.0));
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), FACE_COUNT);
    }

    #[test]
    fn test_rendered_labels_round_trip_to_local_frame() {
        let layout = layout();
        let body = Isometry3::from_parts(
            Translation3::new(0.4, -1.2, 3.0),
            UnitQuaternion::from_euler_angles(0.7, -0.3, 1.9),
        );
        let placed = layout.render_faces(&body);
        assert_eq!(placed.len(), FACE_COUNT);

        let inverse = body.inverse();
        for (label, slot) in placed.iter().zip(layout.slots()) {
            assert_eq!(label.label, slot.label());
            let local = inverse * label.position;
            assert!((local.coords - slot.local_offset()).norm() < 1e-4);
            assert!((local.coords.norm() - 1.01).abs() < 1e-4);

            let local_normal = inverse.rotation * label.normal;
            assert!((local_normal - slot.outward_normal()).norm() < 1e-4);
            // outward: the normal points away from the cube center
            assert!(local_normal.dot(&local.coords) > 0.0);
        }
    }

    #[test]
    fn test_identity_body_places_labels_at_offsets() {
        let layout = FaceLayout::new(0.5, 0.0);
        let placed = layout.render_faces(&Isometry3::identity());
        assert!((placed[2].position - Point3::new(0.0, 0.5, 0.0)).norm() < TOL);
        assert!((placed[2].normal - Vector3::y()).norm() < TOL);
        assert!((placed[5].position - Point3::new(-0.5, 0.0, 0.0)).norm() < TOL);
        assert!((placed[5].normal + Vector3::x()).norm() < TOL);
    }
}
