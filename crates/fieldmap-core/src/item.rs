use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::image::{GeoImage, ImageId};
use crate::projector::GeoProjector;
use crate::rect::WorldRect;
use crate::registry::ItemId;

/// Kind of a decoded visual code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// Marks a row boundary; carries the row (or pass) number.
    Row,
    /// Starts a planting group.
    Group,
    /// Marks a single plant.
    Single,
}

impl CodeKind {
    /// Classify a decoded code payload.
    ///
    /// `K…` is a single-plant code, `NNN…St?`/`NNN…En?` a row code, an
    /// all-digit payload a group code. Anything else is not a field code.
    pub fn classify(payload: &str) -> Option<CodeKind> {
        let lower = payload.to_ascii_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        if chars.first() == Some(&'k') {
            return Some(CodeKind::Single);
        }
        if chars.len() >= 3 {
            let marker: String = chars[chars.len() - 3..chars.len() - 1].iter().collect();
            if marker == "st" || marker == "en" {
                return Some(CodeKind::Row);
            }
        }
        if !chars.is_empty() && chars.iter().all(|c| c.is_ascii_digit()) {
            return Some(CodeKind::Group);
        }
        None
    }

    /// Row number embedded in the first three characters of a row-code payload.
    pub fn embedded_row_number(payload: &str) -> Option<u32> {
        payload.get(..3)?.parse().ok()
    }
}

/// Kind of plant-part fragment produced by the colour detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantPartKind {
    Leaf,
    Stick,
    Tag,
}

/// What a single detection represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "kind")]
pub enum DetectionKind {
    Code(CodeKind),
    PlantPart(PlantPartKind),
}

impl DetectionKind {
    #[inline]
    pub fn is_code(&self) -> bool {
        matches!(self, DetectionKind::Code(_))
    }

    #[inline]
    pub fn code_kind(&self) -> Option<CodeKind> {
        match self {
            DetectionKind::Code(kind) => Some(*kind),
            DetectionKind::PlantPart(_) => None,
        }
    }
}

/// One candidate object found in one image. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    /// Decoded payload for codes, empty for plant parts.
    #[serde(default)]
    pub name: String,
    pub position: Point3<f64>,
    #[serde(default)]
    pub bounds: Option<WorldRect>,
    pub image: ImageId,
}

impl Detection {
    /// Build a detection from a pixel quadrilateral in `image`.
    ///
    /// The position is the world projection of the quadrilateral centre.
    pub fn from_pixels(
        kind: DetectionKind,
        name: impl Into<String>,
        image_id: ImageId,
        image: &GeoImage,
        pixels: &[Point2<f64>; 4],
        projector: &dyn GeoProjector,
    ) -> Self {
        let center = Point2::from(pixels.iter().fold(nalgebra::Vector2::zeros(), |acc, p| {
            acc + p.coords
        }) / 4.0);
        Self {
            kind,
            name: name.into(),
            position: projector.pixel_to_world(image, center),
            bounds: Some(projector.rect_to_world(image, pixels)),
            image: image_id,
        }
    }

    #[inline]
    pub fn xy(&self) -> Point2<f64> {
        self.position.xy()
    }
}

/// A code acting as a field boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub kind: CodeKind,
    pub name: String,
    pub position: Point3<f64>,
    /// Canonical registry entry; `None` for pseudo codes synthesised at row ends.
    #[serde(default)]
    pub item: Option<ItemId>,
    /// Row the code was associated with.
    #[serde(default)]
    pub row: Option<u32>,
}

impl Code {
    /// Pseudo group code standing in for a missing boundary.
    pub fn pseudo(name: impl Into<String>, position: Point3<f64>, row: u32) -> Self {
        Self {
            kind: CodeKind::Group,
            name: name.into(),
            position,
            item: None,
            row: Some(row),
        }
    }

    #[inline]
    pub fn is_pseudo(&self) -> bool {
        self.item.is_none()
    }
}

/// How a plant position came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    /// Backed by a cluster of plant-part detections.
    Detected,
    /// Synthesised where a plant was expected but no evidence was acceptable.
    Created,
}

/// A resolved plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub kind: PlantKind,
    pub position: Point3<f64>,
    #[serde(default)]
    pub bounds: Option<WorldRect>,
    /// Localizer penalty of the chosen candidate (detected plants only).
    #[serde(default)]
    pub penalty: Option<f64>,
    #[serde(default)]
    pub image: Option<ImageId>,
}

impl Plant {
    pub fn created(position: Point3<f64>) -> Self {
        Self {
            kind: PlantKind::Created,
            position,
            bounds: None,
            penalty: None,
            image: None,
        }
    }

    pub fn detected(position: Point3<f64>, bounds: Option<WorldRect>, penalty: f64) -> Self {
        Self {
            kind: PlantKind::Detected,
            position,
            bounds,
            penalty: Some(penalty),
            image: None,
        }
    }

    #[inline]
    pub fn is_created(&self) -> bool {
        self.kind == PlantKind::Created
    }
}

/// Closed set of items that can bound or fill a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "item")]
pub enum FieldItem {
    Code(Code),
    Plant(Plant),
}

impl FieldItem {
    #[inline]
    pub fn position(&self) -> Point3<f64> {
        match self {
            FieldItem::Code(c) => c.position,
            FieldItem::Plant(p) => p.position,
        }
    }

    #[inline]
    pub fn xy(&self) -> Point2<f64> {
        self.position().xy()
    }

    #[inline]
    pub fn code_kind(&self) -> Option<CodeKind> {
        match self {
            FieldItem::Code(c) => Some(c.kind),
            FieldItem::Plant(_) => None,
        }
    }

    #[inline]
    pub fn is_code(&self) -> bool {
        matches!(self, FieldItem::Code(_))
    }

    pub fn as_code(&self) -> Option<&Code> {
        match self {
            FieldItem::Code(c) => Some(c),
            FieldItem::Plant(_) => None,
        }
    }

    pub fn as_plant(&self) -> Option<&Plant> {
        match self {
            FieldItem::Plant(p) => Some(p),
            FieldItem::Code(_) => None,
        }
    }

    pub fn bounds(&self) -> Option<WorldRect> {
        match self {
            FieldItem::Code(_) => None,
            FieldItem::Plant(p) => p.bounds,
        }
    }
}

impl From<Code> for FieldItem {
    fn from(c: Code) -> Self {
        FieldItem::Code(c)
    }
}

impl From<Plant> for FieldItem {
    fn from(p: Plant) -> Self {
        FieldItem::Plant(p)
    }
}
