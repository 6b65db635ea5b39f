//! Depth pixel to world coordinate conversion.

use glam::Vec3;

/// Converts a depth pixel and its depth value into a world-space position.
pub trait CoordinateConverter {
    fn depth_to_world(&self, x: f32, y: f32, depth: f32) -> Vec3;
}

impl<C: CoordinateConverter + ?Sized> CoordinateConverter for &C {
    fn depth_to_world(&self, x: f32, y: f32, depth: f32) -> Vec3 {
        (**self).depth_to_world(x, y, depth)
    }
}

/// Field-of-view camera model used by structured-light depth sensors.
///
/// World units follow the depth unit. X grows to the right, Y grows upward
/// and Z is the depth itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOfView {
    /// Horizontal field of view in radians.
    pub horizontal: f32,
    /// Vertical field of view in radians.
    pub vertical: f32,
    /// Depth image width in pixels.
    pub width: u32,
    /// Depth image height in pixels.
    pub height: u32,
}

impl FieldOfView {
    /// Horizontal field of view of a PrimeSense-class sensor.
    pub const DEFAULT_HORIZONTAL: f32 = 1.0225;
    /// Vertical field of view of a PrimeSense-class sensor.
    pub const DEFAULT_VERTICAL: f32 = 0.7959;

    pub fn new(horizontal: f32, vertical: f32, width: u32, height: u32) -> Self {
        Self {
            horizontal,
            vertical,
            width,
            height,
        }
    }

    /// Default sensor field of view at the given resolution.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self::new(Self::DEFAULT_HORIZONTAL, Self::DEFAULT_VERTICAL, width, height)
    }

    fn xz_factor(&self) -> f32 {
        (self.horizontal / 2.0).tan() * 2.0
    }

    fn yz_factor(&self) -> f32 {
        (self.vertical / 2.0).tan() * 2.0
    }
}

impl CoordinateConverter for FieldOfView {
    fn depth_to_world(&self, x: f32, y: f32, depth: f32) -> Vec3 {
        let nx = x / self.width.max(1) as f32 - 0.5;
        let ny = 0.5 - y / self.height.max(1) as f32;
        Vec3::new(nx * depth * self.xz_factor(), ny * depth * self.yz_factor(), depth)
    }
}
