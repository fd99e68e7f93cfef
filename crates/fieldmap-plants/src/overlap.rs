//! Which images and fragments belong to a segment.

use std::collections::BTreeMap;

use fieldmap_core::{DetectionId, GeoImage, ImageId, ItemRegistry, WorldRect};
use fieldmap_topology::PlantGroupSegment;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::cluster::Fragment;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapParams {
    /// Growth of the segment box on every side, in world units.
    pub segment_pad: f64,
}

impl Default for OverlapParams {
    fn default() -> Self {
        Self { segment_pad: 0.4 }
    }
}

/// Padded east/west/north/south box of `segment`. A special segment's box
/// is centred on its start code.
pub fn segment_box(segment: &PlantGroupSegment, pad: f64) -> WorldRect {
    let a = segment.start.xy();
    let b = if segment.is_special() {
        a
    } else {
        segment.end.xy()
    };
    WorldRect::from_min_max(
        Point2::new(a.x.min(b.x) - pad, a.y.min(b.y) - pad),
        Point2::new(a.x.max(b.x) + pad, a.y.max(b.y) + pad),
    )
}

/// True if the footprint of `image` strictly overlaps `seg_box`. Images
/// without corners never overlap.
pub fn image_overlaps_segment(image: &GeoImage, seg_box: &WorldRect) -> bool {
    image
        .footprint()
        .is_some_and(|footprint| footprint.overlaps(seg_box, 0.0))
}

/// Images whose footprints overlap the padded box of `segment`.
pub fn images_for_segment(
    images: &[GeoImage],
    segment: &PlantGroupSegment,
    params: &OverlapParams,
) -> Vec<ImageId> {
    let seg_box = segment_box(segment, params.segment_pad);
    images
        .iter()
        .enumerate()
        .filter(|(_, image)| image_overlaps_segment(image, &seg_box))
        .map(|(i, _)| ImageId(i))
        .collect()
}

/// Plant-part fragments of the overlapping images lying inside the padded
/// segment box, grouped by image.
pub fn fragments_for_segment(
    registry: &ItemRegistry,
    images: &[GeoImage],
    segment: &PlantGroupSegment,
    params: &OverlapParams,
) -> BTreeMap<ImageId, Vec<Fragment>> {
    let seg_box = segment_box(segment, params.segment_pad);
    let overlapping = images_for_segment(images, segment, params);
    let mut by_image: BTreeMap<ImageId, Vec<Fragment>> = BTreeMap::new();
    for (i, det) in registry.detections().iter().enumerate() {
        if !overlapping.contains(&det.image) || !seg_box.contains(det.xy(), 0.0) {
            continue;
        }
        if let Some(fragment) = Fragment::from_detection(DetectionId(i), det) {
            by_image.entry(fragment.image).or_default().push(fragment);
        }
    }
    by_image
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_core::{Code, CodeKind, Detection, DetectionKind, ImageCorners, PlantPartKind};
    use fieldmap_topology::RowId;
    use nalgebra::Point3;

    fn code(kind: CodeKind, x: f64, y: f64) -> Code {
        Code {
            kind,
            name: "c".into(),
            position: Point3::new(x, y, 0.0),
            item: None,
            row: Some(1),
        }
    }

    fn image(x0: f64, y0: f64, x1: f64, y1: f64) -> GeoImage {
        GeoImage {
            corners: Some(ImageCorners {
                top_left: Point3::new(x0, y1, 0.0),
                top_right: Point3::new(x1, y1, 0.0),
                bottom_right: Point3::new(x1, y0, 0.0),
                bottom_left: Point3::new(x0, y0, 0.0),
            }),
            file_name: "img.jpg".into(),
            time: 0.0,
            position: Point3::new(0.5 * (x0 + x1), 0.5 * (y0 + y1), 2.0),
            zone: String::new(),
            heading_deg: 0.0,
            roll_deg: 0.0,
            pitch_deg: 0.0,
            camera_rotation_deg: 0.0,
            resolution: 0.001,
            width: 2000,
            height: 2000,
        }
    }

    fn leaf(x: f64, y: f64, image: usize) -> Detection {
        Detection {
            kind: DetectionKind::PlantPart(PlantPartKind::Leaf),
            name: String::new(),
            position: Point3::new(x, y, 0.0),
            bounds: Some(WorldRect::centered(Point2::new(x, y), 0.05)),
            image: ImageId(image),
        }
    }

    #[test]
    fn special_segment_box_is_centred_on_start() {
        let seg = PlantGroupSegment::new(
            RowId(0),
            code(CodeKind::Single, 1.0, 1.0),
            code(CodeKind::Group, 1.0, 5.0),
        );
        let (min, max) = segment_box(&seg, 0.5).bounds();
        assert_eq!(min, Point2::new(0.5, 0.5));
        assert_eq!(max, Point2::new(1.5, 1.5));
    }

    #[test]
    fn fragments_are_limited_to_overlapping_images_and_box() {
        let seg = PlantGroupSegment::new(
            RowId(0),
            code(CodeKind::Group, 0.0, 0.0),
            code(CodeKind::Group, 0.0, 4.0),
        );
        let images = vec![image(-1.0, -1.0, 1.0, 2.0), image(5.0, 0.0, 7.0, 2.0)];
        let registry = ItemRegistry::new(vec![
            leaf(0.05, 1.0, 0),
            leaf(0.9, 1.0, 0),
            leaf(6.0, 1.0, 1),
        ]);
        let params = OverlapParams { segment_pad: 0.3 };
        assert_eq!(images_for_segment(&images, &seg, &params), vec![ImageId(0)]);

        let by_image = fragments_for_segment(&registry, &images, &seg, &params);
        assert_eq!(by_image.len(), 1);
        let fragments = &by_image[&ImageId(0)];
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].detection, DetectionId(0));
    }
}
