//! Cross-image deduplication of detections.
//!
//! [`merge_items`] is a single greedy pass: every detection is compared with
//! the canonical items built so far and joins the first one it matches. The
//! cost is O(n·k) for n detections and k canonical items, which is fine for
//! the few hundred codes of a field but does not scale to dense detections.

use fieldmap_core::{
    planar_distance, CanonicalItem, CodeKind, DetectionId, DetectionKind, GeoImage, ItemRegistry,
};
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Half-open capture-time interval `[start, end)` in seconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Deduplication settings. Distances are in world units.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupParams {
    /// Largest distance between two detections of the same object.
    pub max_distance: f64,
    /// Distance floor applied when two codes decode to the same name.
    pub name_match_floor: f64,
    /// Radius used by [`cluster_merged_items`] to split stray members off.
    pub cluster_radius: f64,
    /// Members captured inside these windows are discarded by
    /// [`cluster_merged_items`] unless that would leave nothing.
    pub excluded_windows: Vec<TimeWindow>,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            max_distance: 0.05,
            name_match_floor: 0.30,
            cluster_radius: 0.10,
            excluded_windows: Vec::new(),
        }
    }
}

/// Running state of one canonical item while merging.
struct MergeCandidate {
    item: CanonicalItem,
    sum: Vector2<f64>,
}

impl MergeCandidate {
    fn centroid(&self) -> Point2<f64> {
        Point2::from(self.sum / self.item.len() as f64)
    }
}

/// Decide whether `id` is another view of `candidate`.
fn is_same_item(
    registry: &ItemRegistry,
    id: DetectionId,
    candidate: &MergeCandidate,
    params: &DedupParams,
) -> bool {
    let det = registry.detection(id);
    let primary = registry.detection(candidate.item.primary);
    if det.kind != primary.kind {
        return false;
    }

    // Duplicate row codes next to each other in one frame are legitimate.
    let same_image_allowed = det.kind == DetectionKind::Code(CodeKind::Row);
    if !same_image_allowed
        && candidate
            .item
            .members()
            .any(|m| registry.detection(m).image == det.image)
    {
        return false;
    }

    let mut max_distance = params.max_distance;
    if det.kind.is_code() {
        if det.name != primary.name {
            return false;
        }
        max_distance = max_distance.max(params.name_match_floor);
    }

    planar_distance(det.xy(), candidate.centroid()) <= max_distance
}

/// Merge `ids` into canonical items, in input order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(registry, ids, params), fields(n = ids.len()))
)]
pub fn merge_items(
    registry: &ItemRegistry,
    ids: &[DetectionId],
    params: &DedupParams,
) -> Vec<CanonicalItem> {
    let mut merged: Vec<MergeCandidate> = Vec::new();

    for &id in ids {
        let xy = registry.detection(id).xy();
        match merged
            .iter_mut()
            .find(|c| is_same_item(registry, id, c, params))
        {
            Some(candidate) => {
                candidate.item.others.push(id);
                candidate.sum += xy.coords;
            }
            None => merged.push(MergeCandidate {
                item: CanonicalItem::new(id),
                sum: xy.coords,
            }),
        }
    }

    info!(
        "merged {} detections into {} unique items",
        ids.len(),
        merged.len()
    );
    merged.into_iter().map(|c| c.item).collect()
}

/// Split each item's members into spatial sub-clusters and drop strays.
///
/// A member joins the first sub-cluster holding any member closer than
/// `params.cluster_radius`, otherwise it opens a new one. The largest
/// sub-cluster is kept; if the two largest are the same size nothing can be
/// ruled out and every sub-cluster is kept.
pub fn cluster_merged_items(
    registry: &ItemRegistry,
    images: &[GeoImage],
    items: Vec<CanonicalItem>,
    params: &DedupParams,
) -> Vec<CanonicalItem> {
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        let mut clusters: Vec<Vec<DetectionId>> = Vec::new();
        for member in item.members() {
            let p = registry.detection(member).xy();
            let near = |m: &DetectionId| {
                planar_distance(p, registry.detection(*m).xy()) < params.cluster_radius
            };
            let home = clusters.iter_mut().find(|cluster| cluster.iter().any(near));
            match home {
                Some(cluster) => cluster.push(member),
                None => clusters.push(vec![member]),
            }
        }

        if !params.excluded_windows.is_empty() {
            let filtered: Vec<Vec<DetectionId>> = clusters
                .iter()
                .map(|cluster| {
                    cluster
                        .iter()
                        .copied()
                        .filter(|&m| !captured_in_windows(registry, images, m, params))
                        .collect::<Vec<_>>()
                })
                .filter(|cluster| !cluster.is_empty())
                .collect();
            if !filtered.is_empty() {
                clusters = filtered;
            }
        }

        // Stable: equal sizes keep first-seen order.
        clusters.sort_by_key(|c| std::cmp::Reverse(c.len()));

        let kept: Vec<DetectionId> = match clusters.as_slice() {
            [] => continue,
            [only] => only.clone(),
            [largest, second, ..] if largest.len() > second.len() => largest.clone(),
            all => all.iter().flatten().copied().collect(),
        };

        if kept.len() != item.len() {
            debug!(
                "item '{}': kept {} of {} members in {} sub-clusters",
                registry.detection(item.primary).name,
                kept.len(),
                item.len(),
                clusters.len()
            );
        }

        let (&primary, others) = match kept.split_first() {
            Some(split) => split,
            None => continue,
        };
        out.push(CanonicalItem {
            primary,
            others: others.to_vec(),
        });
    }

    out
}

fn captured_in_windows(
    registry: &ItemRegistry,
    images: &[GeoImage],
    id: DetectionId,
    params: &DedupParams,
) -> bool {
    let Some(image) = images.get(registry.detection(id).image.0) else {
        return false;
    };
    params
        .excluded_windows
        .iter()
        .any(|w| w.contains(image.time))
}
