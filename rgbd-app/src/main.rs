//! rgbd2point
//!
//! Converts a recorded RGB-D capture into a single colored PLY point cloud.
//! Every depth frame is averaged per pixel with outlier rejection, every color
//! frame is averaged per pixel, and each valid depth pixel becomes one point.
//!
//! Exit codes:
//! - 0: success
//! - 1: bad arguments
//! - 2: capture missing, or could not be opened or read
//! - 3: a frame's size differs from its stream's declared resolution
//! - 4: output file could not be written

mod app;

use app::LoggingConfig;
use clap::Parser;
use clap::error::ErrorKind;
use rgbd_fusion::FusionConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

/// rgbd2point - RGB-D capture to PLY point cloud
#[derive(Parser, Debug)]
#[command(name = "rgbd2point")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture directory (or its capture.json manifest)
    capture: PathBuf,

    /// Output PLY file
    output: PathBuf,

    /// Maximum distance from a pixel's running depth average for a new sample to count
    #[arg(short, long, default_value_t = rgbd_fusion::config::DEFAULT_DEPTH_THRESHOLD)]
    threshold: u32,

    /// How long to wait for the next frame before treating the capture as finished
    #[arg(long, default_value_t = 100)]
    timeout_ms: u64,

    /// Accept frames whose resolution differs from the stream's and use the overlap
    #[arg(long)]
    no_resolution_check: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send spans to Tracy
    #[cfg(feature = "tracy")]
    #[arg(long)]
    tracy: bool,
}

impl Args {
    fn fusion_config(&self) -> FusionConfig {
        FusionConfig::default()
            .with_depth_threshold(self.threshold)
            .with_poll_timeout(Duration::from_millis(self.timeout_ms))
            .with_enforce_resolution(!self.no_resolution_check)
    }

    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            #[cfg(feature = "tracy")]
            enable_tracy: self.tracy,
            #[cfg(not(feature = "tracy"))]
            enable_tracy: false,
        }
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    args.logging_config().init();

    if let Err(e) = app::run(&args.capture, &args.output, args.fusion_config()) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
