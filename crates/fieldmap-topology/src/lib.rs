//! Deduplication of code detections and field topology assembly.
//!
//! The entry points are [`merge_items`] / [`cluster_merged_items`], which
//! turn per-image detections into canonical items, and
//! [`FieldTopologyBuilder`], which turns canonical codes into rows,
//! segments and plant groups:
//!
//! ```no_run
//! use fieldmap_core::ItemRegistry;
//! use fieldmap_topology::{merge_items, DedupParams, FieldTopologyBuilder, TopologyParams};
//!
//! # let mut registry = ItemRegistry::default();
//! let ids: Vec<_> = registry.detection_ids().collect();
//! let items = merge_items(&registry, &ids, &DedupParams::default());
//! registry.set_items(items);
//! let built = FieldTopologyBuilder::new(TopologyParams::default()).build(&registry)?;
//! println!("{} rows", built.topology.rows.len());
//! # Ok::<(), fieldmap_topology::TopologyError>(())
//! ```

mod builder;
mod error;
mod groups;
mod merge;
mod numbering;
mod projection;
mod rows;
mod segments;
mod topology;

pub use builder::{
    split_codes, FieldTopologyBuilder, TopologyBuildResult, TopologyParams, TopologyReport,
};
pub use error::TopologyError;
pub use groups::{apply_code_listings, CodeListing};
pub use merge::{cluster_merged_items, merge_items, DedupParams, TimeWindow};
pub use numbering::{number_serpentine, NumberedItem};
pub use projection::{project_codes_to_rows, ProjectedCode};
pub use rows::{RowDirectionTable, RowLabeling, RowSection};
pub use segments::build_segments;
pub use topology::{
    FieldPass, FieldTopology, GroupId, PlantGroup, PlantGroupSegment, Row, RowDirection, RowId,
    SegmentClass, SegmentId,
};
