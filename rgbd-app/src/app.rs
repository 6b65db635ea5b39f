//! Conversion run and process exit codes.

use rgbd_capture::{CaptureError, Recording, StreamKind};
use rgbd_fusion::{FusionConfig, FusionError, FusionPipeline, RunSummary};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    #[cfg_attr(not(feature = "tracy"), allow(dead_code))]
    pub enable_tracy: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_tracy: false,
        }
    }
}

impl LoggingConfig {
    pub fn init(&self) {
        #[cfg(feature = "tracy")]
        {
            if self.enable_tracy {
                use tracing_subscriber::Layer;
                use tracing_subscriber::layer::SubscriberExt;
                use tracing_subscriber::util::SubscriberInitExt;
                tracing_subscriber::registry()
                    .with(tracing_tracy::TracyLayer::default())
                    .with(
                        tracing_subscriber::fmt::layer().with_filter(
                            tracing_subscriber::EnvFilter::try_from_default_env()
                                .unwrap_or_else(|_| self.level.clone().into()),
                        ),
                    )
                    .init();
                return;
            }
        }

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&self.level)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Errors that end a conversion run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Couldn't open device: {0}")]
    OpenDevice(CaptureError),

    #[error(transparent)]
    Fusion(#[from] FusionError),
}

impl AppError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::OpenDevice(_) => 2,
            AppError::Fusion(err) => match err {
                FusionError::Capture(_) | FusionError::NoStreams => 2,
                FusionError::ResolutionMismatch { .. } => 3,
                FusionError::Ply(_) => 4,
                FusionError::InvalidStage { .. } => 1,
            },
        }
    }
}

/// Convert the capture at `capture` into a PLY file at `output`.
///
/// A stream that fails to start is reported and left out; the run carries on
/// with whatever stream remains.
pub fn run(capture: &Path, output: &Path, config: FusionConfig) -> Result<RunSummary, AppError> {
    let mut recording = Recording::open(capture).map_err(AppError::OpenDevice)?;

    for kind in StreamKind::ALL {
        if let Err(err) = recording.start_stream(kind) {
            warn!("Couldn't start the {} stream: {}", kind, err);
        }
    }

    let result = FusionPipeline::new(config).run(&mut recording, output);

    for kind in StreamKind::ALL {
        recording.stop_stream(kind);
    }

    let summary = result?;
    info!(
        "Extracted to point cloud: {} points ({} rejected depth samples)",
        summary.points, summary.stats.rejected_samples
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use rgbd_capture::{DepthImage, FrameEntry, PixelFormat, RecordingManifest, StreamManifest};
    use std::time::Duration;

    fn config() -> FusionConfig {
        FusionConfig::default().with_poll_timeout(Duration::from_millis(5))
    }

    fn write_capture(dir: &Path, depth_size: (u32, u32)) {
        let mut depth = StreamManifest::new(2, 2, PixelFormat::Depth1Mm);
        DepthImage::from_pixel(depth_size.0, depth_size.1, Luma([1200]))
            .save(dir.join("depth.png"))
            .unwrap();
        depth.frames.push(FrameEntry::new("depth.png"));

        let mut color = StreamManifest::new(2, 2, PixelFormat::Rgb888);
        RgbImage::from_pixel(2, 2, Rgb([40, 80, 120]))
            .save(dir.join("color.png"))
            .unwrap();
        color.frames.push(FrameEntry::new("color.png"));

        RecordingManifest {
            depth: Some(depth),
            color: Some(color),
        }
        .save(dir)
        .unwrap();
    }

    #[test]
    fn test_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), (2, 2));
        let output = dir.path().join("cloud.ply");

        let summary = run(dir.path(), &output, config()).unwrap();
        assert_eq!(summary.points, 4);

        let points = rgbd_data::load_points_from_ply(&output).unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.color == [40, 80, 120]));
    }

    #[test]
    fn test_missing_capture_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("absent"), &dir.path().join("out.ply"), config()).unwrap_err();
        assert!(matches!(err, AppError::OpenDevice(CaptureError::NotFound(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unreadable_manifest_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(rgbd_capture::MANIFEST_FILE), "not a manifest").unwrap();
        let err = run(dir.path(), &dir.path().join("out.ply"), config()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_eight_bit_depth_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        let mut depth = StreamManifest::new(1, 1, PixelFormat::Depth1Mm);
        image::GrayImage::from_pixel(1, 1, Luma([100])).save(dir.path().join("d.png")).unwrap();
        depth.frames.push(FrameEntry::new("d.png"));
        RecordingManifest {
            depth: Some(depth),
            color: None,
        }
        .save(dir.path())
        .unwrap();

        let output = dir.path().join("out.ply");
        let err = run(dir.path(), &output, config()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!output.exists());
    }

    #[test]
    fn test_no_streams_exits_2() {
        let dir = tempfile::tempdir().unwrap();
        RecordingManifest::default().save(dir.path()).unwrap();
        let err = run(dir.path(), &dir.path().join("out.ply"), config()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_resolution_mismatch_exits_3() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), (3, 2));
        let err = run(dir.path(), &dir.path().join("out.ply"), config()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_unchecked_resolution_mismatch_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), (3, 2));
        let output = dir.path().join("out.ply");
        let summary = run(dir.path(), &output, config().with_enforce_resolution(false)).unwrap();
        assert_eq!(summary.points, 4);
    }

    #[test]
    fn test_unwritable_output_exits_4() {
        let dir = tempfile::tempdir().unwrap();
        write_capture(dir.path(), (2, 2));
        let output = dir.path().join("no_such_dir").join("out.ply");
        let err = run(dir.path(), &output, config()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_missing_color_stream_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut depth = StreamManifest::new(1, 1, PixelFormat::Depth100Um);
        DepthImage::from_pixel(1, 1, Luma([5000])).save(dir.path().join("d.png")).unwrap();
        depth.frames.push(FrameEntry::new("d.png"));
        RecordingManifest {
            depth: Some(depth),
            color: None,
        }
        .save(dir.path())
        .unwrap();

        let output = dir.path().join("out.ply");
        let summary = run(dir.path(), &output, config()).unwrap();
        assert_eq!(summary.points, 1);
        let points = rgbd_data::load_points_from_ply(&output).unwrap();
        assert_eq!(points[0].color, [204, 204, 204]);
    }
}
