//! Core point cloud types.
//!
//! Positions are world-space floats straight from the depth-to-world
//! conversion; colors are 8-bit channels as they land in the PLY file.

use glam::Vec3;

/// Neutral grey used when a point has no color information (0.8 in linear units).
pub const NEUTRAL_GREY: [u8; 3] = [204, 204, 204];

/// A colored point in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Position in world space.
    pub position: Vec3,
    /// RGB color, one byte per channel.
    pub color: [u8; 3],
}

impl Point {
    /// Create a new point with position and color.
    pub fn new(position: Vec3, color: [u8; 3]) -> Self {
        Self { position, color }
    }

    /// Create a neutral grey point at the given position.
    pub fn uncolored(position: Vec3) -> Self {
        Self {
            position,
            color: NEUTRAL_GREY,
        }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: NEUTRAL_GREY,
        }
    }
}

/// An ordered collection of colored points.
///
/// `capacity` is the number of points the cloud could have held (one per depth
/// pixel); `len()` is how many were actually produced. The point list is fixed
/// once the cloud is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    points: Vec<Point>,
    capacity: usize,
}

impl PointCloud {
    /// Build a cloud from finished points. `capacity` is raised to `points.len()`
    /// if it is smaller.
    pub fn new(points: Vec<Point>, capacity: usize) -> Self {
        let capacity = capacity.max(points.len());
        Self { points, capacity }
    }

    /// A cloud with no points and no capacity.
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            capacity: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
