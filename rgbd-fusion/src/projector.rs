//! Projection of accumulated depth pixels into a colored point cloud.

use crate::accumulator::AccumulationBuffer;
use crate::assembler::PointCloudAssembler;
use crate::mapping::IndexMapper;
use rgbd_capture::CoordinateConverter;
use rgbd_data::types::NEUTRAL_GREY;
use rgbd_data::{Point, PointCloud};
use tracing::{debug, warn};

/// Averaged color channel: `sum / frames`, truncated, clamped to 255.
pub fn normalize_channel(sum: u64, frames: u64) -> u8 {
    debug_assert!(frames > 0);
    (sum / frames.max(1)).min(u64::from(u8::MAX)) as u8
}

/// Walks every depth pixel once and emits a point for each pixel that ever
/// received an accepted sample.
pub struct PointProjector<'a> {
    buffer: &'a AccumulationBuffer,
    mapper: IndexMapper,
    missing_color: [u8; 3],
    on_progress: Option<Box<dyn FnMut(f32) + 'a>>,
}

impl<'a> PointProjector<'a> {
    pub fn new(buffer: &'a AccumulationBuffer) -> Self {
        Self {
            buffer,
            mapper: IndexMapper::new(buffer.depth_resolution(), buffer.color_resolution()),
            missing_color: NEUTRAL_GREY,
            on_progress: None,
        }
    }

    /// Color used when no color frame was ever accumulated.
    pub fn with_missing_color(mut self, color: [u8; 3]) -> Self {
        self.missing_color = color;
        self
    }

    /// Called after each depth row with the fraction of rows done.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f32) + 'a,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Averaged color seen by depth pixel `(x, y)`.
    pub fn sample_color(&self, x: u32, y: u32) -> [u8; 3] {
        let frames = self.buffer.color_frames();
        if frames == 0 {
            return self.missing_color;
        }
        match self.mapper.map_index(x, y) {
            Some(index) => self.buffer.color_sum(index).map(|sum| normalize_channel(sum, frames)),
            None => self.missing_color,
        }
    }

    /// Project every valid depth pixel in row-major order.
    #[tracing::instrument(skip_all, fields(pixels = self.buffer.depth_pixel_count()))]
    pub fn project<C>(mut self, converter: &C) -> PointCloud
    where
        C: CoordinateConverter + ?Sized,
    {
        let (width, height) = self.buffer.depth_resolution();
        let mut assembler = PointCloudAssembler::new(self.buffer.depth_pixel_count());

        if self.buffer.color_frames() == 0 {
            warn!(
                "No color frames accumulated, using {:?} for every point",
                self.missing_color
            );
        }

        for y in 0..height {
            for x in 0..width {
                let index = x as usize + y as usize * width as usize;
                let Some(depth) = self.buffer.average_depth(index) else {
                    continue;
                };

                let position = converter.depth_to_world(x as f32, y as f32, depth);
                let color = self.sample_color(x, y);
                assembler.push(Point::new(position, color));
            }

            let done = (y + 1) as f32 / height as f32;
            debug!("Projected row {} ({:.1}%)", y, done * 100.0);
            if let Some(callback) = self.on_progress.as_mut() {
                callback(done);
            }
        }

        let cloud = assembler.finish();
        debug!("Projected {} of {} depth pixels", cloud.len(), cloud.capacity());
        cloud
    }
}
