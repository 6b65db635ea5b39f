//! Common stream types and the multiplexed stream-set trait.

use crate::converter::CoordinateConverter;
use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// 16-bit single channel depth image in raw sensor units.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors that can occur while opening or reading a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to open capture: {0}")]
    OpenFailed(String),

    #[error("Invalid capture manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("{0} stream is not available")]
    StreamUnavailable(StreamKind),

    #[error("Failed to start {kind} stream: {reason}")]
    StartFailed { kind: StreamKind, reason: String },

    #[error("No {0} frame is ready")]
    NotReady(StreamKind),

    #[error("Failed to read frame: {0}")]
    CaptureFailed(String),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two sensor channels of an RGB-D capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Depth,
    Color,
}

impl StreamKind {
    /// Both kinds, in the order ties are resolved when waiting.
    pub const ALL: [StreamKind; 2] = [StreamKind::Depth, StreamKind::Color];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Depth => f.write_str("depth"),
            StreamKind::Color => f.write_str("color"),
        }
    }
}

/// Pixel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Depth in millimetres.
    #[serde(rename = "depth_1_mm")]
    Depth1Mm,
    /// Depth in units of 100 micrometres.
    #[serde(rename = "depth_100_um")]
    Depth100Um,
    Rgb888,
    Gray8,
    Gray16,
    Yuv422,
    Jpeg,
}

impl PixelFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth1Mm | PixelFormat::Depth100Um)
    }
}

/// Configured resolution and format of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub fps: u32,
}

impl VideoMode {
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat, fps: u32) -> Self {
        Self {
            width,
            height,
            pixel_format,
            fps,
        }
    }

    /// Resolution as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Pixel payload of a frame.
#[derive(Debug, Clone)]
pub enum FramePixels {
    Depth(DepthImage),
    Rgb(RgbImage),
    /// Formats the pipeline does not decode.
    Raw {
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    },
}

/// A single frame read from a stream.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Declared pixel format.
    pub pixel_format: PixelFormat,
    /// Decoded pixels.
    pub pixels: FramePixels,
    /// Frame timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    /// Frame number within its stream.
    pub frame_number: u64,
}

impl FrameData {
    /// Create a depth frame.
    pub fn depth(pixel_format: PixelFormat, image: DepthImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            pixel_format,
            pixels: FramePixels::Depth(image),
            timestamp,
            frame_number,
        }
    }

    /// Create an RGB888 color frame.
    pub fn color(image: RgbImage, timestamp: f64, frame_number: u64) -> Self {
        Self {
            pixel_format: PixelFormat::Rgb888,
            pixels: FramePixels::Rgb(image),
            timestamp,
            frame_number,
        }
    }

    /// Create a frame carrying undecoded bytes.
    pub fn raw(
        pixel_format: PixelFormat,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
        timestamp: f64,
        frame_number: u64,
    ) -> Self {
        Self {
            pixel_format,
            pixels: FramePixels::Raw { width, height, bytes },
            timestamp,
            frame_number,
        }
    }

    /// Get frame dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match &self.pixels {
            FramePixels::Depth(image) => image.dimensions(),
            FramePixels::Rgb(image) => image.dimensions(),
            FramePixels::Raw { width, height, .. } => (*width, *height),
        }
    }
}

/// A set of depth and color streams that can be waited on together.
///
/// This mirrors a sensor SDK: a caller blocks in [`wait_for_any`](Self::wait_for_any)
/// until one stream has a frame, then reads it with [`read_frame`](Self::read_frame).
/// The depth-to-world transform of the depth stream comes with the set.
pub trait StreamSet: CoordinateConverter {
    /// Video mode of a started stream, or `None` if the stream is not running.
    fn video_mode(&self, kind: StreamKind) -> Option<VideoMode>;

    /// Block until a stream has a frame ready, for at most `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapsed with nothing ready.
    fn wait_for_any(&mut self, timeout: Duration) -> Result<Option<StreamKind>, CaptureError>;

    /// Read the ready frame of `kind`.
    fn read_frame(&mut self, kind: StreamKind) -> Result<FrameData, CaptureError>;

    /// Iterate over every frame until the streams go quiet.
    fn frames(&mut self, timeout: Duration) -> Frames<'_, Self>
    where
        Self: Sized,
    {
        Frames::new(self, timeout)
    }
}

/// Lazy, finite sequence of `(StreamKind, FrameData)` pairs.
///
/// Ends cleanly the first time a wait times out. After an error the sequence
/// yields that error once and then ends.
pub struct Frames<'a, S: StreamSet + ?Sized> {
    streams: &'a mut S,
    timeout: Duration,
    finished: bool,
}

impl<'a, S: StreamSet + ?Sized> Frames<'a, S> {
    pub fn new(streams: &'a mut S, timeout: Duration) -> Self {
        Self {
            streams,
            timeout,
            finished: false,
        }
    }
}

impl<S: StreamSet + ?Sized> Iterator for Frames<'_, S> {
    type Item = Result<(StreamKind, FrameData), CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let ready = match self.streams.wait_for_any(self.timeout) {
            Ok(Some(kind)) => kind,
            Ok(None) => {
                info!("No stream ready within {:?}, finished reading", self.timeout);
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        match self.streams.read_frame(ready) {
            Ok(frame) => Some(Ok((ready, frame))),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: StreamSet + ?Sized> std::iter::FusedIterator for Frames<'_, S> {}
