//! Depth pixel to color pixel mapping.

use crate::accumulator::Dims;

/// Nearest-neighbour mapping from depth pixel coordinates to color pixel
/// coordinates when the two streams differ in resolution.
///
/// Each axis is scaled by `color / depth` and truncated, then clamped to the
/// last valid color index. Equal resolutions map every pixel to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMapper {
    depth: Dims,
    color: Dims,
}

impl IndexMapper {
    pub fn new(depth: Dims, color: Dims) -> Self {
        Self { depth, color }
    }

    /// Color coordinate for depth pixel `(x, y)`, or `None` if there is no
    /// color plane to sample.
    pub fn map(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        if self.color.0 == 0 || self.color.1 == 0 {
            return None;
        }
        Some((
            scale_axis(x, self.depth.0, self.color.0),
            scale_axis(y, self.depth.1, self.color.1),
        ))
    }

    /// Row-major color index for depth pixel `(x, y)`.
    pub fn map_index(&self, x: u32, y: u32) -> Option<usize> {
        self.map(x, y)
            .map(|(cx, cy)| cx as usize + cy as usize * self.color.0 as usize)
    }
}

/// `floor(coord / from * to)` in exact integer arithmetic, clamped to `to - 1`.
fn scale_axis(coord: u32, from: u32, to: u32) -> u32 {
    let scaled = u64::from(coord) * u64::from(to) / u64::from(from.max(1));
    scaled.min(u64::from(to - 1)) as u32
}
