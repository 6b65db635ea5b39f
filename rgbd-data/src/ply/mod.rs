//! PLY export and loading

mod loader;
mod writer;

pub use loader::load_points_from_ply;
pub use writer::{PLY_COMMENT, write_ply, write_ply_to};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing PLY files.
#[derive(Debug, Error)]
pub enum PlyError {
    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PLY parsing error: {0}")]
    Parse(String),

    #[error("Missing '{property}' at vertex {index}")]
    MissingProperty { property: &'static str, index: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
