//! Plant recovery along field segments.
//!
//! Fragments of the images overlapping a segment ([`fragments_for_segment`])
//! are clustered per image and then across images ([`cluster_rectangles`]).
//! [`RecursivePlantLocalizer`] places the plants of ordinary segments,
//! [`ClosestSinglePlantFilter`] the single plant of special segments, and
//! [`PlantSpacingFilter`] evens out the result.

mod cluster;
mod error;
mod localize;
mod overlap;
mod single;
mod spacing;

pub use cluster::{
    cluster_fragments, cluster_rectangles, filter_noise, ClusterParams, Fragment, PlantCluster,
};
pub use error::LocalizeError;
pub use localize::{
    LocalizeMode, LocalizedSegment, LocalizerParams, LocalizerStats, RecursivePlantLocalizer,
    SegmentPart,
};
pub use overlap::{
    fragments_for_segment, image_overlaps_segment, images_for_segment, segment_box, OverlapParams,
};
pub use single::{ClosestSinglePlantFilter, SingleFilterParams, SingleFilterStats};
pub use spacing::{PlantSpacingFilter, SpacingFilterParams};
