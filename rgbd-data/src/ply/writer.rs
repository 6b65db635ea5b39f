//! ASCII PLY writer

use crate::ply::PlyError;
use crate::types::PointCloud;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Comment line written into every exported header.
pub const PLY_COMMENT: &str = "created by rgbdsend";

/// Write `cloud` as an ASCII PLY file at `path`, replacing any existing file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), points = cloud.len()))]
pub fn write_ply(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<(), PlyError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| PlyError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    write_ply_to(&mut writer, cloud)?;
    writer.flush()?;

    info!("Wrote {} points to {}", cloud.len(), path.display());
    Ok(())
}

/// Write `cloud` as ASCII PLY into any writer.
///
/// The header declares one vertex element with float32 position and uint8
/// color, plus an empty face element. Each body line is `x y z r g b`.
pub fn write_ply_to<W: Write>(mut writer: W, cloud: &PointCloud) -> Result<(), PlyError> {
    write!(
        writer,
        "ply\n\
         format ascii 1.0\n\
         comment {}\n\
         element vertex {}\n\
         property float32 x\n\
         property float32 y\n\
         property float32 z\n\
         property uint8 red\n\
         property uint8 green\n\
         property uint8 blue\n\
         element face 0\n\
         property list uint8 int32 vertex_indices\n\
         end_header\n",
        PLY_COMMENT,
        cloud.len()
    )?;

    for point in cloud {
        let [r, g, b] = point.color;
        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {} {} {}",
            point.position.x, point.position.y, point.position.z, r, g, b
        )?;
    }

    debug!("Serialized {} vertices", cloud.len());
    Ok(())
}
