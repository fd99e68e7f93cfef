//! Pixel <-> world mapping for geo-referenced frames.
//!
//! The resolution engine only consumes [`GeoProjector`]; callers with a
//! calibrated camera model plug their own implementation in.

use nalgebra::{Point2, Point3, Rotation2, Vector2};

use crate::image::GeoImage;
use crate::rect::WorldRect;

/// Pure mapping between image pixels and world coordinates.
pub trait GeoProjector {
    /// World position of pixel `pixel` (x right, y down) in `image`.
    fn pixel_to_world(&self, image: &GeoImage, pixel: Point2<f64>) -> Point3<f64>;

    /// Pixel of world position `world` in `image`.
    fn world_to_pixel(&self, image: &GeoImage, world: Point2<f64>) -> Point2<f64>;

    /// Project a pixel quadrilateral into a world rectangle.
    fn rect_to_world(&self, image: &GeoImage, pixels: &[Point2<f64>; 4]) -> WorldRect {
        WorldRect::new(pixels.map(|p| self.pixel_to_world(image, p).xy()))
    }
}

/// Nadir camera over flat ground: rotate by heading, scale by resolution.
///
/// Roll and pitch are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGroundProjector;

impl FlatGroundProjector {
    fn rotation(image: &GeoImage) -> Rotation2<f64> {
        // Image +x is "right"; a camera rotation of 0 puts the image top forward.
        Rotation2::new((image.heading_deg + image.camera_rotation_deg - 90.0).to_radians())
    }
}

impl GeoProjector for FlatGroundProjector {
    fn pixel_to_world(&self, image: &GeoImage, pixel: Point2<f64>) -> Point3<f64> {
        let centered = Vector2::new(
            pixel.x - image.width as f64 / 2.0,
            image.height as f64 / 2.0 - pixel.y,
        );
        let offset = Self::rotation(image) * centered * image.resolution;
        Point3::new(
            image.position.x + offset.x,
            image.position.y + offset.y,
            image.position.z,
        )
    }

    fn world_to_pixel(&self, image: &GeoImage, world: Point2<f64>) -> Point2<f64> {
        let offset = (world - image.position.xy()) / image.resolution;
        let centered = Self::rotation(image).inverse() * offset;
        Point2::new(
            centered.x + image.width as f64 / 2.0,
            image.height as f64 / 2.0 - centered.y,
        )
    }
}
