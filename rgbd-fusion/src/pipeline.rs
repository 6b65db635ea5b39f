//! Two-phase fusion pipeline: accumulate every frame, then project and export.

use crate::accumulator::{FrameAccumulator, IngestStats};
use crate::config::FusionConfig;
use crate::error::FusionError;
use crate::projector::PointProjector;
use rgbd_capture::{PixelFormat, StreamKind, StreamSet};
use rgbd_data::{PointCloud, write_ply};
use std::path::Path;
use tracing::{info, warn};

/// Where a [`FusionPipeline`] is in its single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Accumulating,
    Finalizing,
    Serializing,
    Done,
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: IngestStats,
    /// Points written to the output file.
    pub points: usize,
    /// Depth pixels considered.
    pub capacity: usize,
}

/// Whether `format` belongs on a stream of `kind`.
fn format_matches_stream(kind: StreamKind, format: PixelFormat) -> bool {
    match kind {
        StreamKind::Depth => format.is_depth(),
        StreamKind::Color => !format.is_depth(),
    }
}

/// Drives one capture through accumulation, projection and PLY export.
///
/// Stages only move forward; a pipeline that has left `Accumulating` cannot
/// accumulate again.
#[derive(Debug)]
pub struct FusionPipeline {
    config: FusionConfig,
    stage: PipelineStage,
}

impl FusionPipeline {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            stage: PipelineStage::Accumulating,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    fn expect_stage(&self, expected: PipelineStage) -> Result<(), FusionError> {
        if self.stage != expected {
            return Err(FusionError::InvalidStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Accumulate every frame `streams` delivers, then project the result.
    ///
    /// Leaves the pipeline in `Serializing`.
    #[tracing::instrument(skip_all)]
    pub fn build_cloud<S: StreamSet>(
        &mut self,
        streams: &mut S,
    ) -> Result<(PointCloud, IngestStats), FusionError> {
        self.expect_stage(PipelineStage::Accumulating)?;

        let depth_mode = streams.video_mode(StreamKind::Depth);
        let color_mode = streams.video_mode(StreamKind::Color);
        if depth_mode.is_none() && color_mode.is_none() {
            return Err(FusionError::NoStreams);
        }
        if depth_mode.is_none() {
            warn!("No depth stream, the point cloud will be empty");
        }
        if color_mode.is_none() {
            warn!("No color stream, points will use {:?}", self.config.missing_color);
        }

        let depth_resolution = depth_mode.map_or((0, 0), |mode| mode.resolution());
        let color_resolution = color_mode.map_or((0, 0), |mode| mode.resolution());
        info!(
            "Accumulating depth {}x{} and color {}x{}",
            depth_resolution.0, depth_resolution.1, color_resolution.0, color_resolution.1
        );

        let mut accumulator = FrameAccumulator::new(depth_resolution, color_resolution, &self.config);
        for item in streams.frames(self.config.poll_timeout) {
            let (kind, frame) = item?;
            // Frames are routed by pixel format, not by the stream they came from.
            if !format_matches_stream(kind, frame.pixel_format) {
                warn!(
                    "{:?} frame {} arrived on the {} stream",
                    frame.pixel_format, frame.frame_number, kind
                );
            }
            accumulator.ingest(&frame)?;
        }

        let (buffer, stats) = accumulator.finish();
        info!(
            "Finished reading recording: {} depth frames, {} color frames, {} skipped",
            stats.depth_frames, stats.color_frames, stats.skipped_frames
        );
        self.enter(PipelineStage::Finalizing);

        let mut next_report = 0.1;
        let cloud = PointProjector::new(&buffer)
            .with_missing_color(self.config.missing_color)
            .on_progress(|done| {
                if done >= next_report {
                    info!("Projecting: {:.1}%", done * 100.0);
                    while next_report <= done {
                        next_report += 0.1;
                    }
                }
            })
            .project(&*streams);

        info!(
            "Extracted {} points from {} depth pixels",
            cloud.len(),
            cloud.capacity()
        );
        self.enter(PipelineStage::Serializing);
        Ok((cloud, stats))
    }

    /// Write the finished cloud. Leaves the pipeline in `Done`.
    pub fn export(&mut self, cloud: &PointCloud, output: &Path) -> Result<(), FusionError> {
        self.expect_stage(PipelineStage::Serializing)?;
        write_ply(output, cloud)?;
        self.enter(PipelineStage::Done);
        Ok(())
    }

    /// Run the whole pipeline once.
    #[tracing::instrument(skip_all, fields(output = %output.display()))]
    pub fn run<S: StreamSet>(
        &mut self,
        streams: &mut S,
        output: &Path,
    ) -> Result<RunSummary, FusionError> {
        let (cloud, stats) = self.build_cloud(streams)?;
        self.export(&cloud, output)?;
        Ok(RunSummary {
            stats,
            points: cloud.len(),
            capacity: cloud.capacity(),
        })
    }
}

impl Default for FusionPipeline {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}
