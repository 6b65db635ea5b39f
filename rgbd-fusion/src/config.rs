//! Pipeline configuration.

use rgbd_data::types::NEUTRAL_GREY;
use std::time::Duration;

/// Largest deviation from a pixel's running depth average that is still accepted.
pub const DEFAULT_DEPTH_THRESHOLD: u32 = 300;

/// How long to wait for either stream before treating the input as finished.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings for accumulation and projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Rejection band for depth samples, in raw sensor units.
    pub depth_threshold: u32,
    /// Multiplexed wait timeout. A wait that times out ends accumulation.
    pub poll_timeout: Duration,
    /// Fail when a frame's size differs from its stream's declared resolution.
    /// When off, only the overlapping region of such a frame is used.
    pub enforce_resolution: bool,
    /// Color given to every point when no color frame was ever ingested.
    pub missing_color: [u8; 3],
}

impl FusionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth_threshold(mut self, threshold: u32) -> Self {
        self.depth_threshold = threshold;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_enforce_resolution(mut self, enforce: bool) -> Self {
        self.enforce_resolution = enforce;
        self
    }

    pub fn with_missing_color(mut self, color: [u8; 3]) -> Self {
        self.missing_color = color;
        self
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            depth_threshold: DEFAULT_DEPTH_THRESHOLD,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            enforce_resolution: true,
            missing_color: NEUTRAL_GREY,
        }
    }
}
