//! Playback of a recorded capture directory.
//!
//! A recording is a directory holding a `capture.json` manifest and one image
//! file per frame. Depth frames are 16-bit greyscale PNGs in raw sensor units;
//! an 8-bit depth image is a read error. Color frames are RGB8 images. Frames
//! of any other pixel format are handed out as raw file bytes.

use crate::converter::{CoordinateConverter, FieldOfView};
use crate::source::{CaptureError, FrameData, PixelFormat, StreamKind, StreamSet, VideoMode};
use glam::Vec3;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Manifest file name inside a recording directory.
pub const MANIFEST_FILE: &str = "capture.json";

fn default_fps() -> u32 {
    30
}

/// Top-level recording manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<StreamManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<StreamManifest>,
}

/// Declared mode and frame list of one recorded stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamManifest {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Horizontal field of view in radians (depth streams only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_fov: Option<f32>,
    /// Vertical field of view in radians (depth streams only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_fov: Option<f32>,
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

/// One recorded frame, relative to the recording directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEntry {
    pub file: PathBuf,
    /// Seconds since the start of the recording. Defaults to `index / fps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl FrameEntry {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            timestamp: None,
        }
    }

    pub fn at(file: impl Into<PathBuf>, timestamp: f64) -> Self {
        Self {
            file: file.into(),
            timestamp: Some(timestamp),
        }
    }
}

impl StreamManifest {
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
            fps: default_fps(),
            horizontal_fov: None,
            vertical_fov: None,
            frames: Vec::new(),
        }
    }

    pub fn video_mode(&self) -> VideoMode {
        VideoMode::new(self.width, self.height, self.pixel_format, self.fps)
    }

    fn field_of_view(&self) -> FieldOfView {
        FieldOfView::new(
            self.horizontal_fov.unwrap_or(FieldOfView::DEFAULT_HORIZONTAL),
            self.vertical_fov.unwrap_or(FieldOfView::DEFAULT_VERTICAL),
            self.width,
            self.height,
        )
    }

    fn timestamp_of(&self, index: usize) -> f64 {
        self.frames[index]
            .timestamp
            .unwrap_or(index as f64 / self.fps.max(1) as f64)
    }
}

impl RecordingManifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write this manifest into `dir` as `capture.json`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), CaptureError> {
        let file = File::create(dir.as_ref().join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    fn stream(&self, kind: StreamKind) -> Option<&StreamManifest> {
        match kind {
            StreamKind::Depth => self.depth.as_ref(),
            StreamKind::Color => self.color.as_ref(),
        }
    }
}

/// Playback position of a started stream.
#[derive(Debug)]
struct Playback {
    manifest: StreamManifest,
    cursor: usize,
}

impl Playback {
    fn next_timestamp(&self) -> Option<f64> {
        (self.cursor < self.manifest.frames.len()).then(|| self.manifest.timestamp_of(self.cursor))
    }
}

/// A recorded capture, played back once without repeat.
#[derive(Debug)]
pub struct Recording {
    root: PathBuf,
    manifest: RecordingManifest,
    depth: Option<Playback>,
    color: Option<Playback>,
    ready: Option<StreamKind>,
    converter: FieldOfView,
}

impl Recording {
    /// Open a recording directory, or a manifest file directly.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CaptureError::NotFound(path.to_path_buf()));
        }

        let (root, manifest_path) = if path.is_dir() {
            (path.to_path_buf(), path.join(MANIFEST_FILE))
        } else {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, path.to_path_buf())
        };

        let manifest = RecordingManifest::load(&manifest_path)?;
        let converter = manifest
            .depth
            .as_ref()
            .map(StreamManifest::field_of_view)
            .unwrap_or_else(|| FieldOfView::with_resolution(0, 0));

        info!(
            "Opened recording {} (depth: {}, color: {})",
            root.display(),
            manifest.depth.as_ref().map_or(0, |s| s.frames.len()),
            manifest.color.as_ref().map_or(0, |s| s.frames.len()),
        );

        Ok(Self {
            root,
            manifest,
            depth: None,
            color: None,
            ready: None,
            converter,
        })
    }

    /// Create and start a stream, returning its video mode.
    ///
    /// Fails if the recording has no such stream, its mode is unusable, or one
    /// of its frame files is missing. Other streams are unaffected.
    pub fn start_stream(&mut self, kind: StreamKind) -> Result<VideoMode, CaptureError> {
        let manifest = self
            .manifest
            .stream(kind)
            .ok_or(CaptureError::StreamUnavailable(kind))?;

        if manifest.width == 0 || manifest.height == 0 {
            return Err(CaptureError::StartFailed {
                kind,
                reason: format!("invalid resolution {}x{}", manifest.width, manifest.height),
            });
        }

        if let Some(missing) = manifest
            .frames
            .iter()
            .find(|entry| !self.root.join(&entry.file).is_file())
        {
            return Err(CaptureError::StartFailed {
                kind,
                reason: format!("missing frame file {}", missing.file.display()),
            });
        }

        let mode = manifest.video_mode();
        let playback = Playback {
            manifest: manifest.clone(),
            cursor: 0,
        };
        *self.slot_mut(kind) = Some(playback);

        info!(
            "Started {} stream: {}x{} {:?} @ {} fps",
            kind, mode.width, mode.height, mode.pixel_format, mode.fps
        );
        Ok(mode)
    }

    /// Stop a stream. Its unread frames are dropped.
    pub fn stop_stream(&mut self, kind: StreamKind) {
        if let Some(playback) = self.slot_mut(kind).take() {
            info!("{} stream stopped after {} frames", kind, playback.cursor);
        }
        if self.ready == Some(kind) {
            self.ready = None;
        }
    }

    fn slot(&self, kind: StreamKind) -> Option<&Playback> {
        match kind {
            StreamKind::Depth => self.depth.as_ref(),
            StreamKind::Color => self.color.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: StreamKind) -> &mut Option<Playback> {
        match kind {
            StreamKind::Depth => &mut self.depth,
            StreamKind::Color => &mut self.color,
        }
    }

    fn decode(&self, entry: &FrameEntry, mode: VideoMode, timestamp: f64, frame_number: u64) -> Result<FrameData, CaptureError> {
        let path = self.root.join(&entry.file);
        let frame = match mode.pixel_format {
            PixelFormat::Depth1Mm | PixelFormat::Depth100Um => match image::open(&path)? {
                DynamicImage::ImageLuma16(image) => {
                    FrameData::depth(mode.pixel_format, image, timestamp, frame_number)
                }
                other => {
                    return Err(CaptureError::CaptureFailed(format!(
                        "{}: depth frames must be 16-bit greyscale, found {:?}",
                        path.display(),
                        other.color()
                    )));
                }
            },
            PixelFormat::Rgb888 => {
                let image = image::open(&path)?.into_rgb8();
                FrameData::color(image, timestamp, frame_number)
            }
            other => {
                let bytes = std::fs::read(&path)?;
                FrameData::raw(other, mode.width, mode.height, bytes, timestamp, frame_number)
            }
        };
        Ok(frame)
    }
}

impl CoordinateConverter for Recording {
    fn depth_to_world(&self, x: f32, y: f32, depth: f32) -> Vec3 {
        self.converter.depth_to_world(x, y, depth)
    }
}

impl StreamSet for Recording {
    fn video_mode(&self, kind: StreamKind) -> Option<VideoMode> {
        self.slot(kind).map(|playback| playback.manifest.video_mode())
    }

    /// Playback never blocks: the earliest pending frame across started streams
    /// is ready immediately, and an exhausted recording behaves like a timeout.
    fn wait_for_any(&mut self, _timeout: Duration) -> Result<Option<StreamKind>, CaptureError> {
        if self.ready.is_some() {
            return Ok(self.ready);
        }

        let mut earliest: Option<(StreamKind, f64)> = None;
        for kind in StreamKind::ALL {
            let Some(timestamp) = self.slot(kind).and_then(Playback::next_timestamp) else {
                continue;
            };
            if earliest.is_none_or(|(_, best)| timestamp < best) {
                earliest = Some((kind, timestamp));
            }
        }

        self.ready = earliest.map(|(kind, _)| kind);
        Ok(self.ready)
    }

    fn read_frame(&mut self, kind: StreamKind) -> Result<FrameData, CaptureError> {
        if self.ready != Some(kind) {
            return Err(CaptureError::NotReady(kind));
        }

        let playback = self.slot(kind).ok_or(CaptureError::StreamUnavailable(kind))?;
        let index = playback.cursor;
        let entry = playback.manifest.frames[index].clone();
        let timestamp = playback.manifest.timestamp_of(index);
        let mode = playback.manifest.video_mode();

        let frame = self.decode(&entry, mode, timestamp, index as u64)?;

        if let Some(playback) = self.slot_mut(kind).as_mut() {
            playback.cursor += 1;
        }
        self.ready = None;

        debug!("Read {} frame {} at {:.3}s", kind, index, timestamp);
        Ok(frame)
    }
}
