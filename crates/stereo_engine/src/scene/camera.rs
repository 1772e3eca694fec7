//! Anaglyph stereo projection
//!
//! The camera projects world-space segments onto the `z = 0` viewing
//! plane twice, once per eye, with the eyes offset horizontally from a
//! shared center. Projection is a pure function of the camera
//! parameters and the eye position, so nothing here is cached.

use crate::foundation::math::Vec3;
use crate::scene::node::Segment;

/// Default eye center offset relative to the camera node's position
pub const DEFAULT_POSITION_MODIFIER: [f32; 3] = [0.0, 3.0, -10.0];

/// Default horizontal distance from the eye center to each eye
pub const DEFAULT_EYE_TO_CENTER: f32 = 0.5;

/// Left and right eye projections of one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoPair {
    /// Segment as seen by the left eye
    pub left: Segment,
    /// Segment as seen by the right eye
    pub right: Segment,
}

/// Stereo projection parameters.
///
/// The effective eye center is `position_modifier` plus the camera
/// node's local position, so nudging the node shifts both eyes without
/// touching the configured offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoCamera {
    /// Offset added to the camera node's position to get the eye center
    pub position_modifier: Vec3,
    /// Horizontal distance from the eye center to each eye
    pub eye_to_center: f32,
    /// Output viewport size, used to preserve aspect ratio.
    ///
    /// Must be non-zero in both components.
    pub view_size: [f32; 2],
}

impl Default for StereoCamera {
    fn default() -> Self {
        Self {
            position_modifier: Vec3::from(DEFAULT_POSITION_MODIFIER),
            eye_to_center: DEFAULT_EYE_TO_CENTER,
            view_size: [1.0, 1.0],
        }
    }
}

impl StereoCamera {
    /// Create a camera with the given eye separation
    pub fn new(eye_to_center: f32) -> Self {
        Self {
            eye_to_center,
            ..Self::default()
        }
    }

    // Points in front of the eye plane would divide by a vanishing
    // denominator; the caller keeps geometry on the far side.
    fn project_eye(&self, eye_center: Vec3, eye_offset: f32, p: Vec3) -> Vec3 {
        let denominator = eye_center.z - p.z;
        Vec3::new(
            (p.x * eye_center.z - p.z * (eye_center.x + eye_offset)) / denominator,
            (eye_center.z * -p.y + eye_center.y * p.z) / denominator,
            0.0,
        )
    }

    // Maps x from [0;1] into viewport proportions so circles stay round.
    fn preserve_aspect_ratio(&self, p: Vec3) -> Vec3 {
        Vec3::new(p.x * self.view_size[1] / self.view_size[0], p.y, p.z)
    }

    /// Project one world-space segment for both eyes.
    ///
    /// `position` is the camera node's local position; see the type
    /// docs for how it combines with the modifier.
    pub fn project(&self, position: Vec3, segment: &Segment) -> StereoPair {
        let eye_center = self.position_modifier + position;
        let project = |offset: f32, p: Vec3| {
            self.preserve_aspect_ratio(self.project_eye(eye_center, offset, p))
        };
        StereoPair {
            left: Segment::new(
                project(-self.eye_to_center, segment.start),
                project(-self.eye_to_center, segment.end),
            ),
            right: Segment::new(
                project(self.eye_to_center, segment.start),
                project(self.eye_to_center, segment.end),
            ),
        }
    }
}
