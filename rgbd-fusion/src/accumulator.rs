//! Per-pixel accumulation of depth and color frames.

use crate::config::FusionConfig;
use crate::error::FusionError;
use image::RgbImage;
use rgbd_capture::{DepthImage, FrameData, FramePixels, PixelFormat, StreamKind};
use tracing::{debug, warn};

/// Width and height of a frame or buffer plane.
pub type Dims = (u32, u32);

/// Running depth and color sums for one capture.
///
/// Depth pixels keep their own accepted-sample count; color pixels share a
/// single frame counter. The buffer is only mutated by [`FrameAccumulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationBuffer {
    depth_resolution: Dims,
    color_resolution: Dims,
    depth_sums: Vec<u64>,
    depth_counts: Vec<u32>,
    color_sums: Vec<[u64; 3]>,
    color_frames: u64,
}

impl AccumulationBuffer {
    /// Zeroed buffer for the given depth and color resolutions.
    pub fn new(depth_resolution: Dims, color_resolution: Dims) -> Self {
        let depth_len = depth_resolution.0 as usize * depth_resolution.1 as usize;
        let color_len = color_resolution.0 as usize * color_resolution.1 as usize;
        Self {
            depth_resolution,
            color_resolution,
            depth_sums: vec![0; depth_len],
            depth_counts: vec![0; depth_len],
            color_sums: vec![[0; 3]; color_len],
            color_frames: 0,
        }
    }

    pub fn depth_resolution(&self) -> Dims {
        self.depth_resolution
    }

    pub fn color_resolution(&self) -> Dims {
        self.color_resolution
    }

    /// Number of depth pixels, which is also the point cloud capacity.
    pub fn depth_pixel_count(&self) -> usize {
        self.depth_sums.len()
    }

    /// Accepted samples at depth pixel `index` (row-major).
    pub fn depth_count(&self, index: usize) -> u32 {
        self.depth_counts[index]
    }

    /// Sum of accepted samples at depth pixel `index`.
    pub fn depth_sum(&self, index: usize) -> u64 {
        self.depth_sums[index]
    }

    /// Mean of the accepted samples, or `None` if the pixel never had one.
    pub fn average_depth(&self, index: usize) -> Option<f32> {
        match self.depth_counts[index] {
            0 => None,
            count => Some((self.depth_sums[index] as f64 / count as f64) as f32),
        }
    }

    /// Channel sums at color pixel `index` (row-major).
    pub fn color_sum(&self, index: usize) -> [u64; 3] {
        self.color_sums[index]
    }

    /// Number of color frames folded in.
    pub fn color_frames(&self) -> u64 {
        self.color_frames
    }
}

/// What [`FrameAccumulator::ingest`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Depth,
    Color,
    /// The frame's pixel format is not one the accumulator understands.
    Skipped,
}

/// Counters collected while ingesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub depth_frames: u64,
    pub color_frames: u64,
    pub skipped_frames: u64,
    pub accepted_samples: u64,
    pub rejected_samples: u64,
    pub invalid_samples: u64,
}

/// Folds frames into an [`AccumulationBuffer`].
///
/// A zero depth sample means "no reading" and is ignored. The first non-zero
/// sample at a pixel is always accepted; every later one must lie strictly
/// within `depth_threshold` of the average of the samples accepted so far.
/// A bad first sample therefore pins the pixel for the rest of the run.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: AccumulationBuffer,
    depth_threshold: u32,
    enforce_resolution: bool,
    stats: IngestStats,
}

impl FrameAccumulator {
    pub fn new(depth_resolution: Dims, color_resolution: Dims, config: &FusionConfig) -> Self {
        Self {
            buffer: AccumulationBuffer::new(depth_resolution, color_resolution),
            depth_threshold: config.depth_threshold,
            enforce_resolution: config.enforce_resolution,
            stats: IngestStats::default(),
        }
    }

    pub fn buffer(&self) -> &AccumulationBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Give up ownership of the buffer once accumulation is over.
    pub fn finish(self) -> (AccumulationBuffer, IngestStats) {
        (self.buffer, self.stats)
    }

    /// Fold one frame into the buffer.
    ///
    /// Frames of an unknown pixel format are skipped with a warning. A frame
    /// whose size differs from the declared resolution is an error when
    /// resolution enforcement is on.
    pub fn ingest(&mut self, frame: &FrameData) -> Result<Ingested, FusionError> {
        let format = frame.pixel_format;
        match &frame.pixels {
            FramePixels::Depth(image) if format.is_depth() => {
                let size = self.checked_size(StreamKind::Depth, image.dimensions())?;
                self.ingest_depth(image, size);
                self.stats.depth_frames += 1;
                Ok(Ingested::Depth)
            }
            FramePixels::Rgb(image) if format == PixelFormat::Rgb888 => {
                let size = self.checked_size(StreamKind::Color, image.dimensions())?;
                self.ingest_color(image, size);
                self.stats.color_frames += 1;
                Ok(Ingested::Color)
            }
            _ => {
                warn!("Unknown format {:?} for frame {}, skipping", format, frame.frame_number);
                self.stats.skipped_frames += 1;
                Ok(Ingested::Skipped)
            }
        }
    }

    /// Region of a frame of `actual` size that maps onto the buffer plane.
    fn checked_size(&self, kind: StreamKind, actual: Dims) -> Result<Dims, FusionError> {
        let expected = match kind {
            StreamKind::Depth => self.buffer.depth_resolution,
            StreamKind::Color => self.buffer.color_resolution,
        };

        if actual == expected {
            return Ok(actual);
        }
        if self.enforce_resolution {
            return Err(FusionError::ResolutionMismatch {
                kind,
                expected,
                actual,
            });
        }

        debug!(
            "{} frame is {}x{}, buffer is {}x{}; using the overlap",
            kind, actual.0, actual.1, expected.0, expected.1
        );
        Ok((actual.0.min(expected.0), actual.1.min(expected.1)))
    }

    fn ingest_depth(&mut self, image: &DepthImage, (width, height): Dims) {
        let stride = self.buffer.depth_resolution.0 as usize;
        let threshold = self.depth_threshold as f64;

        for y in 0..height {
            for x in 0..width {
                let sample = image.get_pixel(x, y).0[0];
                if sample == 0 {
                    self.stats.invalid_samples += 1;
                    continue;
                }

                let index = x as usize + y as usize * stride;
                let count = self.buffer.depth_counts[index];
                let accept = count == 0 || {
                    let average = self.buffer.depth_sums[index] as f64 / count as f64;
                    (average - sample as f64).abs() < threshold
                };

                if accept {
                    self.buffer.depth_sums[index] += u64::from(sample);
                    self.buffer.depth_counts[index] += 1;
                    self.stats.accepted_samples += 1;
                } else {
                    self.stats.rejected_samples += 1;
                }
            }
        }
    }

    fn ingest_color(&mut self, image: &RgbImage, (width, height): Dims) {
        let stride = self.buffer.color_resolution.0 as usize;

        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = image.get_pixel(x, y).0;
                let sums = &mut self.buffer.color_sums[x as usize + y as usize * stride];
                sums[0] += u64::from(r);
                sums[1] += u64::from(g);
                sums[2] += u64::from(b);
            }
        }

        self.buffer.color_frames += 1;
    }
}
