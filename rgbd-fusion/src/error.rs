//! Error types for the fusion pipeline.

use crate::pipeline::PipelineStage;
use rgbd_capture::{CaptureError, StreamKind};
use rgbd_data::PlyError;
use thiserror::Error;

/// Errors that abort a fusion run.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("PLY export error: {0}")]
    Ply(#[from] PlyError),

    #[error(
        "{kind} frame is {}x{} but the stream declared {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    ResolutionMismatch {
        kind: StreamKind,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Neither a depth nor a color stream is running")]
    NoStreams,

    #[error("Pipeline is {actual:?}, expected {expected:?}")]
    InvalidStage {
        expected: PipelineStage,
        actual: PipelineStage,
    },
}
