//! JSON survey input, configuration and report output.

use std::{fs, path::Path};

use fieldmap_core::{Code, Detection, GeoImage};
use fieldmap_plants::{
    ClusterParams, LocalizerParams, OverlapParams, SingleFilterParams, SpacingFilterParams,
};
use fieldmap_topology::{DedupParams, NumberedItem, RowDirection, TopologyParams};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::PipelineStats;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Settings for every pipeline stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapConfig {
    pub dedup: DedupParams,
    pub topology: TopologyParams,
    pub cluster: ClusterParams,
    pub localizer: LocalizerParams,
    pub single: SingleFilterParams,
    pub spacing: SpacingFilterParams,
    pub overlap: OverlapParams,
    /// Fill missing image corners with the flat-ground projector.
    pub project_missing_corners: bool,
}

impl Default for FieldMapConfig {
    fn default() -> Self {
        Self {
            dedup: DedupParams::default(),
            topology: TopologyParams::default(),
            cluster: ClusterParams::default(),
            localizer: LocalizerParams::default(),
            single: SingleFilterParams::default(),
            spacing: SpacingFilterParams::default(),
            overlap: OverlapParams::default(),
            project_missing_corners: true,
        }
    }
}

impl FieldMapConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        write_json(self, path.as_ref())
    }
}

/// Pipeline input: the images of a survey and everything detected in them.
///
/// `Detection::image` indexes into `images`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldSurvey {
    #[serde(default)]
    pub images: Vec<GeoImage>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl FieldSurvey {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        write_json(self, path.as_ref())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowSummary {
    pub number: u32,
    pub pass: u32,
    pub direction: RowDirection,
    pub start_code: String,
    pub end_code: String,
    pub length: f64,
    pub segments: usize,
    pub plants: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Name of the code opening the group.
    pub id: String,
    #[serde(default)]
    pub alternate_id: Option<String>,
    #[serde(default)]
    pub expected_num_plants: Option<u32>,
    pub num_plants: usize,
    pub segments: usize,
    pub length: f64,
}

/// Serializable result of one pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldMapReport {
    pub stats: PipelineStats,
    pub rows: Vec<RowSummary>,
    pub groups: Vec<GroupSummary>,
    /// Codes and plants in serpentine order.
    pub items: Vec<NumberedItem>,
    /// Codes too far from every row.
    pub unassociated: Vec<Code>,
}

impl FieldMapReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        write_json(self, path.as_ref())
    }

    /// Groups whose plant count differs from their listed maximum.
    pub fn mismatched_groups(&self) -> impl Iterator<Item = &GroupSummary> {
        self.groups.iter().filter(|g| {
            g.expected_num_plants
                .is_some_and(|expected| expected as usize != g.num_plants)
        })
    }
}
