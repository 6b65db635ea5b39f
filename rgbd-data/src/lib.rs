//! rgbd2point Data Crate
//!
//! Point cloud types and PLY serialization shared by the capture, fusion and
//! application crates. Nothing in here knows about sensors or frames.

pub mod ply;
pub mod types;

pub use ply::{PlyError, load_points_from_ply, write_ply, write_ply_to};
pub use types::{Point, PointCloud};
