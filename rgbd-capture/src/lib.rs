//! rgbd2point Capture - depth and color stream sources
//!
//! This crate defines the boundary between the fusion pipeline and whatever
//! produces RGB-D frames:
//!
//! - [`StreamSet`]: a set of depth/color streams with a multiplexed
//!   "wait for whichever is ready" primitive and a depth-to-world transform
//! - [`Frames`]: the lazy, finite `(StreamKind, FrameData)` sequence built on top
//! - [`Recording`]: playback of a recorded capture directory
//! - [`ChannelStreams`]: a live source fed over a channel
//!
//! ## Example
//!
//! ```ignore
//! use rgbd_capture::{Recording, StreamKind, StreamSet};
//! use std::time::Duration;
//!
//! let mut recording = Recording::open("capture/")?;
//! recording.start_stream(StreamKind::Depth)?;
//! recording.start_stream(StreamKind::Color)?;
//! for item in recording.frames(Duration::from_millis(100)) {
//!     let (kind, frame) = item?;
//!     // Accumulate frame...
//! }
//! ```

mod channel;
mod converter;
mod recording;
mod source;

pub use channel::{ChannelStreams, FrameSender};
pub use converter::{CoordinateConverter, FieldOfView};
pub use recording::{MANIFEST_FILE, Recording, RecordingManifest, StreamManifest, FrameEntry};
pub use source::{
    CaptureError, DepthImage, FrameData, FramePixels, Frames, PixelFormat, StreamKind, StreamSet,
    VideoMode,
};
