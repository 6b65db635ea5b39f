//! rgbd2point Fusion Crate
//!
//! Turns a finite stream of depth and color frames into one colored point
//! cloud. The work happens in two phases that never interleave:
//!
//! - accumulation: [`FrameAccumulator`] folds every frame into per-pixel sums,
//!   rejecting depth outliers against the running average
//! - finalization: [`PointProjector`] averages each depth pixel, converts it to
//!   world space and samples the averaged color through an [`IndexMapper`]
//!
//! [`FusionPipeline`] drives both phases over a [`rgbd_capture::StreamSet`] and
//! writes the result as PLY.

pub mod accumulator;
pub mod assembler;
pub mod config;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod projector;

pub use accumulator::{AccumulationBuffer, Dims, FrameAccumulator, IngestStats, Ingested};
pub use assembler::PointCloudAssembler;
pub use config::FusionConfig;
pub use error::FusionError;
pub use mapping::IndexMapper;
pub use pipeline::{FusionPipeline, PipelineStage, RunSummary};
pub use projector::PointProjector;
