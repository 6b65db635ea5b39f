//! Point cloud assembly.

use rgbd_data::{Point, PointCloud};

/// Collects projected points into a cloud sized for the depth resolution.
///
/// The cloud's point count is whatever was pushed; it is fixed by
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct PointCloudAssembler {
    points: Vec<Point>,
    capacity: usize,
}

impl PointCloudAssembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point. Returns `false` and drops the point once the cloud is full.
    pub fn push(&mut self, point: Point) -> bool {
        if self.points.len() >= self.capacity {
            return false;
        }
        self.points.push(point);
        true
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

    /// Trim to the points actually produced and seal the cloud.
    pub fn finish(mut self) -> PointCloud {
        self.points.shrink_to_fit();
        PointCloud::new(self.points, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_finish_keeps_count_and_capacity() {
        let mut assembler = PointCloudAssembler::new(4);
        assert!(assembler.push(Point::new(Vec3::X, [1, 2, 3])));
        assert!(assembler.push(Point::new(Vec3::Y, [4, 5, 6])));
        assert_eq!(assembler.len(), 2);

        let cloud = assembler.finish();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.capacity(), 4);
        assert_eq!(cloud.points()[1].color, [4, 5, 6]);
    }

    #[test]
    fn test_push_beyond_capacity() {
        let mut assembler = PointCloudAssembler::new(1);
        assert!(assembler.push(Point::default()));
        assert!(!assembler.push(Point::default()));
        assert_eq!(assembler.finish().len(), 1);
    }

    #[test]
    fn test_empty_assembler() {
        let assembler = PointCloudAssembler::new(0);
        assert!(assembler.is_empty());
        assert_eq!(assembler.capacity(), 0);
        assert!(assembler.finish().is_empty());
    }
}
