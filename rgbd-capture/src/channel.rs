//! Live stream set fed over a channel.
//!
//! Producers (device callbacks, decoder threads) push frames through a
//! [`FrameSender`]; the consumer waits on the receiving end with a timeout.
//! Silence longer than the timeout, or every sender hanging up, ends input.

use crate::converter::{CoordinateConverter, FieldOfView};
use crate::source::{CaptureError, FrameData, StreamKind, StreamSet, VideoMode};
use glam::Vec3;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, warn};

/// Sending half handed to frame producers.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<(StreamKind, FrameData)>,
}

impl FrameSender {
    /// Push a frame. Fails once the receiving stream set is dropped.
    pub fn send(&self, kind: StreamKind, frame: FrameData) -> Result<(), CaptureError> {
        self.tx
            .send((kind, frame))
            .map_err(|_| CaptureError::CaptureFailed(format!("{} stream receiver closed", kind)))
    }
}

/// Stream set whose frames arrive over an mpsc channel.
pub struct ChannelStreams {
    rx: Receiver<(StreamKind, FrameData)>,
    depth: Option<VideoMode>,
    color: Option<VideoMode>,
    pending: Option<(StreamKind, FrameData)>,
    converter: FieldOfView,
}

impl ChannelStreams {
    /// Create an empty stream set and the sender that feeds it.
    pub fn new(converter: FieldOfView) -> (Self, FrameSender) {
        let (tx, rx) = mpsc::channel();
        let streams = Self {
            rx,
            depth: None,
            color: None,
            pending: None,
            converter,
        };
        (streams, FrameSender { tx })
    }

    /// Declare a running stream and its video mode.
    pub fn with_stream(mut self, kind: StreamKind, mode: VideoMode) -> Self {
        match kind {
            StreamKind::Depth => self.depth = Some(mode),
            StreamKind::Color => self.color = Some(mode),
        }
        self
    }
}

impl CoordinateConverter for ChannelStreams {
    fn depth_to_world(&self, x: f32, y: f32, depth: f32) -> Vec3 {
        self.converter.depth_to_world(x, y, depth)
    }
}

impl StreamSet for ChannelStreams {
    fn video_mode(&self, kind: StreamKind) -> Option<VideoMode> {
        match kind {
            StreamKind::Depth => self.depth,
            StreamKind::Color => self.color,
        }
    }

    fn wait_for_any(&mut self, timeout: Duration) -> Result<Option<StreamKind>, CaptureError> {
        if let Some((kind, _)) = &self.pending {
            return Ok(Some(*kind));
        }

        loop {
            match self.rx.recv_timeout(timeout) {
                Ok((kind, frame)) => {
                    if self.video_mode(kind).is_none() {
                        warn!("Dropping frame {} from undeclared {} stream", frame.frame_number, kind);
                        continue;
                    }
                    self.pending = Some((kind, frame));
                    return Ok(Some(kind));
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All frame producers disconnected");
                    return Ok(None);
                }
            }
        }
    }

    fn read_frame(&mut self, kind: StreamKind) -> Result<FrameData, CaptureError> {
        match self.pending.take() {
            Some((ready, frame)) if ready == kind => Ok(frame),
            other => {
                self.pending = other;
                Err(CaptureError::NotReady(kind))
            }
        }
    }
}
