//! PLY file loading functions

use crate::ply::PlyError;
use crate::types::{NEUTRAL_GREY, Point};
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Deserialize, Debug)]
#[allow(dead_code)]
struct PlyFace {
    vertex_indices: Vec<i32>,
}

#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
    #[serde(default, rename = "face")]
    face: Vec<PlyFace>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .and_then(|u| u8::try_from(u).ok())
            .or_else(|| n.as_f64().map(|f| f.clamp(0.0, 255.0) as u8)),
        _ => None,
    })
}

/// Load colored points from a PLY file.
///
/// Accepts `red/green/blue` or `r/g/b` color properties; vertices without
/// color come back neutral grey. Faces are parsed but ignored.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_points_from_ply(path: impl AsRef<Path>) -> Result<Vec<Point>, PlyError> {
    let path = path.as_ref();
    debug!("Loading PLY points from: {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        PlyError::Parse(e.to_string())
    })?;

    info!(
        "PLY file parsed: {} vertices, {} faces",
        ply_data.vertex.len(),
        ply_data.face.len()
    );

    let mut points = Vec::with_capacity(ply_data.vertex.len());

    for (index, vertex) in ply_data.vertex.iter().enumerate() {
        let coord = |property: &'static str| {
            get_f32(vertex.get(property)).ok_or(PlyError::MissingProperty { property, index })
        };
        let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

        let color = if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("red")),
            get_u8(vertex.get("green")),
            get_u8(vertex.get("blue")),
        ) {
            [r, g, b]
        } else if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("r")),
            get_u8(vertex.get("g")),
            get_u8(vertex.get("b")),
        ) {
            [r, g, b]
        } else {
            NEUTRAL_GREY
        };

        points.push(Point::new(position, color));
    }

    debug!("Loaded {} points from PLY file", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::write_ply;
    use crate::types::PointCloud;

    #[test]
    fn test_load_written_cloud() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.ply");
        let cloud = PointCloud::new(
            vec![
                Point::new(Vec3::new(0.5, -1.0, 250.0), [1, 2, 3]),
                Point::new(Vec3::new(-3.25, 4.0, 99.0), [200, 100, 50]),
            ],
            2,
        );
        write_ply(&path, &cloud).unwrap();

        let loaded = load_points_from_ply(&path).unwrap();
        assert_eq!(loaded.len(), cloud.len());
        for (got, want) in loaded.iter().zip(cloud.iter()) {
            assert!((got.position - want.position).length() < 1e-4);
            assert_eq!(got.color, want.color);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_points_from_ply(dir.path().join("nope.ply")).unwrap_err();
        assert!(matches!(err, PlyError::Io(_)));
    }
}
