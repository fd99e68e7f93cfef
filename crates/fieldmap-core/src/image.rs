use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::projector::GeoProjector;
use crate::rect::WorldRect;

/// Index of a [`GeoImage`] inside a survey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub usize);

/// World positions of the four image corners (pixel `(0,0)` is top-left).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageCorners {
    pub top_left: Point3<f64>,
    pub top_right: Point3<f64>,
    pub bottom_right: Point3<f64>,
    pub bottom_left: Point3<f64>,
}

/// A geo-referenced camera frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeoImage {
    pub file_name: String,
    /// Capture time, seconds since the Unix epoch.
    #[serde(default)]
    pub time: f64,
    /// Camera position (easting, northing, altitude).
    pub position: Point3<f64>,
    #[serde(default)]
    pub zone: String,
    /// Vehicle heading; 0 is east, counter-clockwise positive.
    pub heading_deg: f64,
    #[serde(default)]
    pub roll_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
    /// Camera mounting rotation; 0 means image top faces forward.
    #[serde(default)]
    pub camera_rotation_deg: f64,
    /// World units per pixel.
    pub resolution: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub corners: Option<ImageCorners>,
}

impl GeoImage {
    /// Fill [`GeoImage::corners`] using `projector`.
    pub fn compute_corners(&mut self, projector: &dyn GeoProjector) {
        let w = self.width as f64;
        let h = self.height as f64;
        self.corners = Some(ImageCorners {
            top_left: projector.pixel_to_world(self, Point2::new(0.0, 0.0)),
            top_right: projector.pixel_to_world(self, Point2::new(w, 0.0)),
            bottom_right: projector.pixel_to_world(self, Point2::new(w, h)),
            bottom_left: projector.pixel_to_world(self, Point2::new(0.0, h)),
        });
    }

    /// Ground footprint, if corners are known.
    pub fn footprint(&self) -> Option<WorldRect> {
        self.corners.map(|c| {
            WorldRect::new([
                c.top_left.xy(),
                c.top_right.xy(),
                c.bottom_right.xy(),
                c.bottom_left.xy(),
            ])
        })
    }
}
