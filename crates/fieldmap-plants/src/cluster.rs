//! Agglomerative clustering of plant-part fragments.
//!
//! Every round scans all cluster pairs for the smallest corner-to-corner
//! distance, so one call is O(n³) in the number of fragments. Inputs are the
//! fragments of one segment (tens); batches in the hundreds should be split
//! before clustering.

use fieldmap_core::{Detection, DetectionId, DetectionKind, ImageId, PlantPartKind, WorldRect};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One plant-part detection with its world footprint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub detection: DetectionId,
    pub kind: PlantPartKind,
    pub bounds: WorldRect,
    pub image: ImageId,
}

impl Fragment {
    /// `None` unless the detection is a plant part with a footprint.
    pub fn from_detection(id: DetectionId, det: &Detection) -> Option<Self> {
        let DetectionKind::PlantPart(kind) = det.kind else {
            return None;
        };
        Some(Self {
            detection: id,
            kind,
            bounds: det.bounds?,
            image: det.image,
        })
    }
}

/// Merged footprint of fragments believed to belong to one plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantCluster {
    pub bounds: WorldRect,
    pub fragments: Vec<Fragment>,
}

impl PlantCluster {
    pub fn from_fragment(fragment: Fragment) -> Self {
        Self {
            bounds: fragment.bounds,
            fragments: vec![fragment],
        }
    }

    /// Centre of the footprint.
    #[inline]
    pub fn position(&self) -> Point2<f64> {
        self.bounds.center()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn contains(&self, kind: PlantPartKind) -> bool {
        self.fragments.iter().any(|f| f.kind == kind)
    }

    /// Image of the first contributing fragment.
    pub fn image(&self) -> Option<ImageId> {
        self.fragments.first().map(|f| f.image)
    }

    /// Smallest corner-to-corner distance to `other`.
    #[inline]
    pub fn distance(&self, other: &PlantCluster) -> f64 {
        self.bounds.corner_distance(&other.bounds)
    }

    fn merged(&self, other: &PlantCluster) -> PlantCluster {
        let mut fragments = self.fragments.clone();
        fragments.extend(other.fragments.iter().cloned());
        PlantCluster {
            bounds: self.bounds.union(&other.bounds),
            fragments,
        }
    }
}

/// Clustering limits, in world units.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Clusters farther apart than this are never merged.
    pub max_spacing: f64,
    /// Largest width or height a merged cluster may reach.
    pub max_size: f64,
    /// Clusters with fewer fragments than this are noise candidates.
    pub min_fragments: usize,
    /// Noise candidates whose larger side is below this are dropped.
    pub min_size: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            max_spacing: 0.10,
            max_size: 0.40,
            min_fragments: 2,
            min_size: 0.02,
        }
    }
}

fn closest_pair(clusters: &[PlantCluster]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            let d = clusters[i].distance(&clusters[j]);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

/// Merge the closest pair of clusters until the pair is too far apart or
/// the merge would grow past `max_size`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(clusters, params), fields(n = clusters.len()))
)]
pub fn cluster_rectangles(
    mut clusters: Vec<PlantCluster>,
    params: &ClusterParams,
) -> Vec<PlantCluster> {
    let input = clusters.len();
    while let Some((i, j, d)) = closest_pair(&clusters) {
        if d > params.max_spacing {
            break;
        }
        let merged = clusters[i].merged(&clusters[j]);
        let (w, h) = merged.bounds.extent();
        if w > params.max_size || h > params.max_size {
            debug!("closest pair would grow to {w:.3} x {h:.3}, stopping");
            break;
        }
        // j > i, so removing j leaves i in place.
        clusters.remove(j);
        clusters[i] = merged;
    }
    debug!("clustered {input} fragments into {} clusters", clusters.len());
    clusters
}

/// Cluster raw fragments.
pub fn cluster_fragments(fragments: Vec<Fragment>, params: &ClusterParams) -> Vec<PlantCluster> {
    cluster_rectangles(
        fragments.into_iter().map(PlantCluster::from_fragment).collect(),
        params,
    )
}

/// Drop clusters that are both sparse and tiny.
pub fn filter_noise(clusters: Vec<PlantCluster>, params: &ClusterParams) -> Vec<PlantCluster> {
    clusters
        .into_iter()
        .filter(|c| {
            let (w, h) = c.bounds.extent();
            c.len() >= params.min_fragments || w.max(h) >= params.min_size
        })
        .collect()
}
