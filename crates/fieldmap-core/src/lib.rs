//! Core types and utilities for geo-referenced field mapping.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any image decoder or code reader: detections arrive already
//! positioned in world coordinates (or are projected through a
//! [`GeoProjector`]).

mod geometry;
mod image;
mod item;
mod logger;
mod projector;
mod rect;
mod registry;

pub use geometry::{
    angles_within, axis_offset, bearing_deg, midpoint, orient_pair, path_length, planar_distance,
    point_along, wrap_angle_deg, AxisOffset, PairOrder,
};
pub use image::{GeoImage, ImageCorners, ImageId};
pub use item::{
    Code, CodeKind, Detection, DetectionKind, FieldItem, Plant, PlantKind, PlantPartKind,
};
pub use projector::{FlatGroundProjector, GeoProjector};
pub use rect::WorldRect;
pub use registry::{CanonicalItem, DetectionId, ItemId, ItemRegistry};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_for_verbosity};
