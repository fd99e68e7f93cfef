//! Synthetic one-row survey seen by two overlapping images.
//!
//! Row 1 runs north from `001St` at y = 0 to `001En` at y = 10. Group codes
//! `100` (y = 2) and `101` (y = 5.6) bound a segment with room for six
//! plants; four of them are detected, two are missing. A single code `K7`
//! at y = 8 has one plant next to it.

#![allow(dead_code)]

use fieldmap::core::{
    CodeKind, Detection, DetectionKind, GeoImage, ImageCorners, ImageId, PlantPartKind, WorldRect,
};
use fieldmap::{FieldMapConfig, FieldSurvey};
use nalgebra::{Point2, Point3};

pub const DETECTED_PLANTS: [f64; 4] = [2.3, 2.9, 4.1, 5.3];
pub const GROUP_PLANTS: [f64; 6] = [2.3, 2.9, 3.5, 4.1, 4.7, 5.3];

fn image(name: &str, time: f64) -> GeoImage {
    let corner = |x: f64, y: f64| Point3::new(x, y, 0.0);
    GeoImage {
        file_name: name.into(),
        time,
        position: Point3::new(0.0, 5.0, 3.0),
        zone: "14S".into(),
        heading_deg: 90.0,
        roll_deg: 0.0,
        pitch_deg: 0.0,
        camera_rotation_deg: 0.0,
        resolution: 0.005,
        width: 400,
        height: 2400,
        corners: Some(ImageCorners {
            top_left: corner(-1.0, 11.0),
            top_right: corner(1.0, 11.0),
            bottom_right: corner(1.0, -1.0),
            bottom_left: corner(-1.0, -1.0),
        }),
    }
}

fn code(kind: CodeKind, name: &str, x: f64, y: f64, image: usize) -> Detection {
    Detection {
        kind: DetectionKind::Code(kind),
        name: name.into(),
        position: Point3::new(x, y, 0.0),
        bounds: Some(WorldRect::centered(Point2::new(x, y), 0.1)),
        image: ImageId(image),
    }
}

fn part(kind: PlantPartKind, x: f64, y: f64, size: f64, image: usize) -> Detection {
    Detection {
        kind: DetectionKind::PlantPart(kind),
        name: String::new(),
        position: Point3::new(x, y, 0.0),
        bounds: Some(WorldRect::centered(Point2::new(x, y), size)),
        image: ImageId(image),
    }
}

pub fn survey() -> FieldSurvey {
    let mut detections = Vec::new();
    for image in 0..2 {
        let jitter = 0.01 * image as f64;
        detections.push(code(CodeKind::Row, "001St", jitter, 0.0, image));
        detections.push(code(CodeKind::Row, "001En", jitter, 10.0, image));
        detections.push(code(CodeKind::Group, "100", jitter, 2.0, image));
        detections.push(code(CodeKind::Group, "101", jitter, 5.6, image));
        detections.push(code(CodeKind::Single, "K7", jitter, 8.0, image));

        for y in DETECTED_PLANTS {
            detections.push(part(PlantPartKind::Leaf, 0.0, y, 0.05, image));
            detections.push(part(PlantPartKind::Stick, 0.01, y, 0.02, image));
        }
        detections.push(part(PlantPartKind::Leaf, 0.1, 8.1, 0.05, image));
        detections.push(part(PlantPartKind::Tag, 0.1, 8.1, 0.02, image));
    }

    FieldSurvey {
        images: vec![image("a.jpg", 0.0), image("b.jpg", 1.0)],
        detections,
    }
}

pub fn config() -> FieldMapConfig {
    FieldMapConfig::default()
}
