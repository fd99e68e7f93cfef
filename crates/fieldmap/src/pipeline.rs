//! End-to-end run: detections in, ordered field map out.

use fieldmap_core::{Code, DetectionId, FlatGroundProjector, GeoImage, ItemRegistry};
use fieldmap_plants::{
    cluster_fragments, cluster_rectangles, filter_noise, fragments_for_segment,
    ClosestSinglePlantFilter, LocalizedSegment, LocalizerStats, PlantCluster, PlantSpacingFilter,
    RecursivePlantLocalizer, SingleFilterStats,
};
use fieldmap_topology::{
    cluster_merged_items, merge_items, number_serpentine, FieldTopology, FieldTopologyBuilder,
    NumberedItem, PlantGroupSegment, SegmentId, TopologyReport,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::PipelineError;
use crate::io::{FieldMapConfig, FieldMapReport, FieldSurvey, GroupSummary, RowSummary};

/// Counters collected over one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub detections: usize,
    /// Canonical code items after deduplication.
    pub codes: usize,
    pub topology: TopologyReport,
    /// Candidate clusters over all segments.
    pub clusters: usize,
    pub localizer: LocalizerStats,
    pub single: SingleFilterStats,
    /// Plants moved by the spacing filter.
    pub spacing_replaced: usize,
    /// Segments left empty because localization failed.
    pub failed_segments: usize,
}

/// Result of [`FieldMapper::run`].
#[derive(Clone, Debug)]
pub struct FieldMap {
    pub images: Vec<GeoImage>,
    pub registry: ItemRegistry,
    pub topology: FieldTopology,
    pub numbered: Vec<NumberedItem>,
    pub unassociated: Vec<Code>,
    pub stats: PipelineStats,
}

impl FieldMap {
    pub fn report(&self) -> FieldMapReport {
        let t = &self.topology;
        let rows = t
            .rows_by_number()
            .into_iter()
            .map(|id| {
                let row = t.row(id);
                RowSummary {
                    number: row.number,
                    pass: row.pass,
                    direction: row.direction,
                    start_code: row.start.name.clone(),
                    end_code: row.end.name.clone(),
                    length: t.row_length(id),
                    segments: row.segments.len(),
                    plants: row
                        .segments
                        .iter()
                        .map(|&s| t.segment(s).plants.len())
                        .sum(),
                }
            })
            .collect();
        let groups = t
            .group_ids()
            .map(|id| {
                let group = t.group(id);
                GroupSummary {
                    id: t
                        .group_start_code(id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                    alternate_id: group.alternate_id.clone(),
                    expected_num_plants: group.expected_num_plants,
                    num_plants: group
                        .segments
                        .iter()
                        .map(|&s| t.segment(s).plants.len())
                        .sum(),
                    segments: group.segments.len(),
                    length: t.group_length(id),
                }
            })
            .collect();
        FieldMapReport {
            stats: self.stats.clone(),
            rows,
            groups,
            items: self.numbered.clone(),
            unassociated: self.unassociated.clone(),
        }
    }
}

/// Runs every stage with one configuration.
pub struct FieldMapper {
    config: FieldMapConfig,
}

impl FieldMapper {
    pub fn new(config: FieldMapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FieldMapConfig {
        &self.config
    }

    /// Deduplicate codes, build the topology and place the plants of every
    /// segment.
    ///
    /// Fails only when no topology can be built. Per-segment localization
    /// failures are logged and leave that segment without plants.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, survey), fields(detections = survey.detections.len()))
    )]
    pub fn run(&self, survey: FieldSurvey) -> Result<FieldMap, PipelineError> {
        let FieldSurvey {
            mut images,
            detections,
        } = survey;
        if self.config.project_missing_corners {
            for image in images.iter_mut().filter(|i| i.corners.is_none()) {
                image.compute_corners(&FlatGroundProjector);
            }
        }

        let mut registry = ItemRegistry::new(detections);
        let code_ids: Vec<DetectionId> = registry
            .detection_ids()
            .filter(|&id| registry.detection(id).kind.is_code())
            .collect();
        let merged = merge_items(&registry, &code_ids, &self.config.dedup);
        let items = cluster_merged_items(&registry, &images, merged, &self.config.dedup);
        registry.set_items(items);

        let built = FieldTopologyBuilder::new(self.config.topology.clone()).build(&registry)?;
        let mut topology = built.topology;
        let mut stats = PipelineStats {
            detections: registry.detections().len(),
            codes: registry.items().len(),
            topology: built.report,
            ..PipelineStats::default()
        };

        let mut single = ClosestSinglePlantFilter::new(self.config.single.clone());
        let segment_ids: Vec<SegmentId> = topology.segment_ids().collect();
        for id in segment_ids {
            let segment = topology.segment(id);
            let clusters = self.segment_clusters(&registry, &images, segment);
            stats.clusters += clusters.len();

            let plants = if segment.is_special() {
                segment
                    .start
                    .as_code()
                    .map(|code| vec![single.find_plant(code, &clusters)])
                    .unwrap_or_default()
            } else {
                match self.localize(id, segment, &clusters) {
                    Ok((located, replaced)) => {
                        stats.localizer.accumulate(&located.stats);
                        stats.spacing_replaced += replaced;
                        located.plants
                    }
                    Err(err) => {
                        warn!("{err}, leaving the segment empty");
                        stats.failed_segments += 1;
                        Vec::new()
                    }
                }
            };
            topology.segment_mut(id).plants = plants;
        }
        stats.single = single.stats();

        let numbered = number_serpentine(&topology);
        info!(
            "mapped {} rows, {} groups, {} plants ({} detected)",
            topology.rows.len(),
            topology.groups.len(),
            stats.localizer.total() + stats.single.detected + stats.single.created,
            stats.localizer.detected + stats.single.detected
        );

        Ok(FieldMap {
            images,
            registry,
            topology,
            numbered,
            unassociated: built.unassociated,
            stats,
        })
    }

    /// Candidate plant clusters for `segment`: fragments are clustered per
    /// image, then across images, then filtered for noise.
    pub fn segment_clusters(
        &self,
        registry: &ItemRegistry,
        images: &[GeoImage],
        segment: &PlantGroupSegment,
    ) -> Vec<PlantCluster> {
        let params = &self.config.cluster;
        let per_image: Vec<PlantCluster> =
            fragments_for_segment(registry, images, segment, &self.config.overlap)
                .into_values()
                .flat_map(|fragments| cluster_fragments(fragments, params))
                .collect();
        filter_noise(cluster_rectangles(per_image, params), params)
    }

    /// Localize the plants of an ordinary segment and smooth their spacing.
    /// Returns the plants with the number the spacing filter replaced.
    pub fn localize(
        &self,
        id: SegmentId,
        segment: &PlantGroupSegment,
        clusters: &[PlantCluster],
    ) -> Result<(LocalizedSegment, usize), PipelineError> {
        let localizer = RecursivePlantLocalizer::new(self.config.localizer.clone());
        let mut located = localizer
            .locate_segment(segment, clusters)
            .map_err(|source| PipelineError::Localize {
                segment: id.0,
                source,
            })?;
        let replaced = PlantSpacingFilter::new(self.config.spacing.clone()).apply(
            &segment.start,
            &mut located.plants,
            &segment.end,
        );
        Ok((located, replaced))
    }
}
