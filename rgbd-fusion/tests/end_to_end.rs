use image::{Luma, Rgb, RgbImage};
use rgbd_capture::{
    DepthImage, FrameEntry, PixelFormat, Recording, RecordingManifest, StreamKind, StreamManifest,
};
use rgbd_data::load_points_from_ply;
use rgbd_fusion::{FusionConfig, FusionPipeline, RunSummary};
use std::path::Path;
use std::time::Duration;

/// Depth frames as row-major samples, color frames as row-major pixels,
/// each with its timestamp.
struct Capture {
    depth_size: (u32, u32),
    color_size: (u32, u32),
    depth: Vec<(f64, Vec<u16>)>,
    color: Vec<(f64, Vec<[u8; 3]>)>,
}

impl Capture {
    fn write(&self, dir: &Path) {
        let mut depth = StreamManifest::new(self.depth_size.0, self.depth_size.1, PixelFormat::Depth1Mm);
        for (i, (timestamp, samples)) in self.depth.iter().enumerate() {
            let image = DepthImage::from_raw(self.depth_size.0, self.depth_size.1, samples.clone()).unwrap();
            let file = format!("depth_{:06}.png", i);
            image.save(dir.join(&file)).unwrap();
            depth.frames.push(FrameEntry::at(file, *timestamp));
        }

        let mut color = StreamManifest::new(self.color_size.0, self.color_size.1, PixelFormat::Rgb888);
        for (i, (timestamp, pixels)) in self.color.iter().enumerate() {
            let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
            let image = RgbImage::from_raw(self.color_size.0, self.color_size.1, raw).unwrap();
            let file = format!("color_{:06}.png", i);
            image.save(dir.join(&file)).unwrap();
            color.frames.push(FrameEntry::at(file, *timestamp));
        }

        RecordingManifest {
            depth: Some(depth),
            color: Some(color),
        }
        .save(dir)
        .unwrap();
    }
}

fn config() -> FusionConfig {
    FusionConfig::default().with_poll_timeout(Duration::from_millis(5))
}

fn convert(capture_dir: &Path, output: &Path) -> RunSummary {
    let mut recording = Recording::open(capture_dir).unwrap();
    recording.start_stream(StreamKind::Depth).unwrap();
    recording.start_stream(StreamKind::Color).unwrap();
    FusionPipeline::new(config()).run(&mut recording, output).unwrap()
}

fn split_ply(text: &str) -> (usize, Vec<&str>) {
    let (header, body) = text.split_once("end_header\n").unwrap();
    let declared = header
        .lines()
        .find_map(|line| line.strip_prefix("element vertex "))
        .unwrap()
        .parse()
        .unwrap();
    (declared, body.lines().collect())
}

fn small_capture() -> Capture {
    Capture {
        depth_size: (2, 2),
        color_size: (2, 2),
        depth: vec![
            (0.0, vec![100, 100, 100, 0]),
            (0.1, vec![100, 100, 100, 0]),
            (0.2, vec![100, 100, 100, 0]),
        ],
        color: vec![
            (0.05, vec![[10, 0, 0], [20, 0, 0], [30, 60, 90], [0, 0, 0]]),
            (0.15, vec![[0, 0, 0], [0, 0, 0], [30, 60, 90], [0, 0, 0]]),
        ],
    }
}

#[test]
fn test_invalid_pixel_excluded_from_output() {
    let dir = tempfile::tempdir().unwrap();
    small_capture().write(dir.path());
    let output = dir.path().join("out.ply");

    let summary = convert(dir.path(), &output);
    assert_eq!(summary.points, 3);
    assert_eq!(summary.capacity, 4);
    assert_eq!(summary.stats.depth_frames, 3);
    assert_eq!(summary.stats.color_frames, 2);

    let points = load_points_from_ply(&output).unwrap();
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|p| p.position.z == 100.0));

    let colors: Vec<[u8; 3]> = points.iter().map(|p| p.color).collect();
    assert_eq!(colors, vec![[5, 0, 0], [10, 0, 0], [30, 60, 90]]);
}

#[test]
fn test_header_count_matches_body() {
    let dir = tempfile::tempdir().unwrap();
    small_capture().write(dir.path());
    let output = dir.path().join("out.ply");

    let summary = convert(dir.path(), &output);
    let text = std::fs::read_to_string(&output).unwrap();
    let (declared, body) = split_ply(&text);
    assert_eq!(declared, summary.points);
    assert_eq!(body.len(), declared);
    assert!(text.contains("element face 0\n"));
}

#[test]
fn test_repeat_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    small_capture().write(dir.path());
    let first = dir.path().join("first.ply");
    let second = dir.path().join("second.ply");

    convert(dir.path(), &first);
    convert(dir.path(), &second);
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_interleaving_does_not_change_output() {
    let color_late = small_capture();
    let mut color_early = small_capture();
    for (i, (timestamp, _)) in color_early.color.iter_mut().enumerate() {
        *timestamp = -1.0 + i as f64 * 0.01;
    }

    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    color_late.write(a.path());
    color_early.write(b.path());

    let out_a = a.path().join("out.ply");
    let out_b = b.path().join("out.ply");
    convert(a.path(), &out_a);
    convert(b.path(), &out_b);
    assert_eq!(std::fs::read(&out_a).unwrap(), std::fs::read(&out_b).unwrap());
}

#[test]
fn test_smaller_color_maps_edge_to_last_pixel() {
    // 3x3 depth over 2x2 color: depth (2, 2) scales to (1, 1), the last color pixel.
    let mut color = vec![[0, 0, 0]; 4];
    color[3] = [250, 125, 5];
    let capture = Capture {
        depth_size: (3, 3),
        color_size: (2, 2),
        depth: vec![(0.0, vec![0, 0, 0, 0, 0, 0, 0, 0, 400])],
        color: vec![(0.0, color)],
    };

    let dir = tempfile::tempdir().unwrap();
    capture.write(dir.path());
    let output = dir.path().join("out.ply");
    convert(dir.path(), &output);

    let points = load_points_from_ply(&output).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].color, [250, 125, 5]);
}

#[test]
fn test_outlier_frames_do_not_shift_average() {
    let capture = Capture {
        depth_size: (1, 1),
        color_size: (1, 1),
        depth: vec![
            (0.0, vec![2000]),
            (0.1, vec![2100]),
            (0.2, vec![9000]),
            (0.3, vec![1900]),
        ],
        color: vec![(0.0, vec![[1, 2, 3]])],
    };

    let dir = tempfile::tempdir().unwrap();
    capture.write(dir.path());
    let output = dir.path().join("out.ply");
    let summary = convert(dir.path(), &output);
    assert_eq!(summary.stats.rejected_samples, 1);

    let points = load_points_from_ply(&output).unwrap();
    assert_eq!(points[0].position.z, 2000.0);
}

#[test]
fn test_unknown_color_format_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut depth = StreamManifest::new(1, 1, PixelFormat::Depth1Mm);
    DepthImage::from_pixel(1, 1, Luma([700])).save(dir.path().join("d.png")).unwrap();
    depth.frames.push(FrameEntry::at("d.png", 0.0));

    let mut color = StreamManifest::new(1, 1, PixelFormat::Yuv422);
    RgbImage::from_pixel(1, 1, Rgb([9, 9, 9])).save(dir.path().join("c.png")).unwrap();
    color.frames.push(FrameEntry::at("c.png", 0.1));

    RecordingManifest {
        depth: Some(depth),
        color: Some(color),
    }
    .save(dir.path())
    .unwrap();

    let output = dir.path().join("out.ply");
    let mut recording = Recording::open(dir.path()).unwrap();
    recording.start_stream(StreamKind::Depth).unwrap();
    recording.start_stream(StreamKind::Color).unwrap();
    let summary = FusionPipeline::new(config().with_missing_color([0, 0, 0]))
        .run(&mut recording, &output)
        .unwrap();

    assert_eq!(summary.stats.skipped_frames, 1);
    assert_eq!(summary.points, 1);
    let points = load_points_from_ply(&output).unwrap();
    assert_eq!(points[0].color, [0, 0, 0]);
}
