//! Math utilities and types
//!
//! Provides the fundamental math types for the scene graph: 3D vectors
//! and unit quaternions, plus the rigid placement (position + rotation)
//! used for transform composition up the parent chain.

pub use nalgebra::{Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Unit quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Tolerance used when deciding a rotation is close enough to identity
/// to skip quaternion application during batch transforms.
pub const ROTATION_EPSILON: f32 = 1e-6;

/// Returns true if the rotation is numerically indistinguishable from
/// the identity rotation.
pub fn is_near_identity(rotation: &Quat) -> bool {
    rotation.angle() < ROTATION_EPSILON
}

/// Rigid placement: a position and a rotation, no scale.
///
/// This is the per-node local transform of the scene graph. Applying a
/// placement rotates first, then translates; chains of placements from
/// a node up to the root compose into the node's world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Placement {
    /// Create a new identity placement
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a placement with only a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a placement with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Apply this placement to a point: rotate, then translate.
    pub fn apply(&self, point: Vec3) -> Vec3 {
        if is_near_identity(&self.rotation) {
            point + self.position
        } else {
            self.rotation * point + self.position
        }
    }

    /// Exact inverse of [`Self::apply`]: untranslate, then unrotate.
    pub fn apply_inverse(&self, point: Vec3) -> Vec3 {
        if is_near_identity(&self.rotation) {
            point - self.position
        } else {
            self.rotation.inverse() * (point - self.position)
        }
    }

    /// Combine this placement with a child placement.
    ///
    /// The result applies `child` first, then `self`, matching how a
    /// parent's transform wraps its children's.
    pub fn combine(&self, child: &Self) -> Self {
        Self {
            position: self.apply(child.position),
            rotation: self.rotation * child.rotation,
        }
    }

    /// Get the inverse placement
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: inv_rotation * (-self.position),
            rotation: inv_rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn identity_placement_is_a_no_op() {
        let placement = Placement::identity();
        let point = Vec3::new(1.0, -2.0, 3.0);

        assert_relative_eq!(placement.apply(point), point, epsilon = EPSILON);
        assert_relative_eq!(placement.apply_inverse(point), point, epsilon = EPSILON);
    }

    #[test]
    fn apply_rotates_before_translating() {
        let placement = Placement::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0),
        );

        // (0, 0, 1) rotated 90 degrees around Y becomes (1, 0, 0),
        // then translation lands it at (2, 0, 0).
        let result = placement.apply(Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(result, Vec3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn apply_inverse_round_trips() {
        let placement = Placement::from_position_rotation(
            Vec3::new(2.0, 3.0, 1.0),
            Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(1.0, 1.0, 0.5)), 0.785),
        );
        let point = Vec3::new(-4.0, 0.25, 7.0);

        let there = placement.apply(point);
        let back = placement.apply_inverse(there);
        assert_relative_eq!(back, point, epsilon = EPSILON);
    }

    #[test]
    fn combine_matches_sequential_application() {
        let parent = Placement::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), PI / 2.0),
        );
        let child = Placement::from_position(Vec3::new(0.0, 0.0, 1.0));
        let point = Vec3::new(0.5, 0.5, 0.5);

        let combined = parent.combine(&child);
        assert_relative_eq!(
            combined.apply(point),
            parent.apply(child.apply(point)),
            epsilon = EPSILON
        );
    }

    #[test]
    fn inverse_combines_to_identity() {
        let placement = Placement::from_position_rotation(
            Vec3::new(2.0, 3.0, 1.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.785),
        );

        let should_be_identity = placement.combine(&placement.inverse());
        assert_relative_eq!(should_be_identity.position, Vec3::zeros(), epsilon = EPSILON);
        assert!(is_near_identity(&should_be_identity.rotation));
    }

    #[test]
    fn near_identity_detection() {
        assert!(is_near_identity(&Quat::identity()));
        assert!(!is_near_identity(&Quat::from_axis_angle(
            &Vec3::x_axis(),
            0.01
        )));
    }
}
