//! High-level facade crate for the `fieldmap-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, topology and plant crates
//! - [`FieldMapper`], which runs deduplication, topology assembly and plant
//!   localization end to end
//! - JSON survey/config/report types and the `fieldmap` binary (feature `cli`)
//!
//! ## Quickstart
//!
//! ```no_run
//! use fieldmap::{FieldMapConfig, FieldMapper, FieldSurvey};
//!
//! # fn main() -> Result<(), fieldmap::PipelineError> {
//! let survey = FieldSurvey::load_json("survey.json")?;
//! let map = FieldMapper::new(FieldMapConfig::default()).run(survey)?;
//! map.report().write_json("field_map.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `fieldmap::core`: geometry, images, items and the detection registry.
//! - `fieldmap::topology`: code deduplication, rows, segments, groups, numbering.
//! - `fieldmap::plants`: fragment clustering, plant localization and filters.

pub use fieldmap_core as core;
pub use fieldmap_plants as plants;
pub use fieldmap_topology as topology;

mod error;
mod io;
mod pipeline;

pub use error::PipelineError;
pub use io::{FieldMapConfig, FieldMapReport, FieldSurvey, GroupSummary, RowSummary};
pub use pipeline::{FieldMap, FieldMapper, PipelineStats};
