//! Plant selection for special segments, which hold exactly one plant next
//! to a single code.

use fieldmap_core::{planar_distance, Code, Plant};
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::cluster::PlantCluster;

const FRAGMENT_COUNT_WEIGHT: f64 = 0.2;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleFilterParams {
    /// Candidates at or beyond this distance from the code are ignored.
    pub max_distance: f64,
}

impl Default for SingleFilterParams {
    fn default() -> Self {
        Self { max_distance: 0.4 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleFilterStats {
    pub detected: usize,
    pub created: usize,
}

/// Picks the closest well-supported cluster around a single code.
pub struct ClosestSinglePlantFilter {
    params: SingleFilterParams,
    stats: SingleFilterStats,
}

impl ClosestSinglePlantFilter {
    pub fn new(params: SingleFilterParams) -> Self {
        Self {
            params,
            stats: SingleFilterStats::default(),
        }
    }

    pub fn params(&self) -> &SingleFilterParams {
        &self.params
    }

    pub fn stats(&self) -> SingleFilterStats {
        self.stats
    }

    /// `d / max_distance`, NaN at or beyond `max_distance`.
    pub fn distance_penalty(&self, distance: f64) -> f64 {
        if distance < self.params.max_distance {
            distance / self.params.max_distance
        } else {
            f64::NAN
        }
    }

    /// Clusters built from fewer fragments are less trusted.
    pub fn fragment_count_penalty(cluster: &PlantCluster) -> f64 {
        match cluster.len() {
            0 | 1 => 1.0,
            2 => 0.5,
            _ => 0.0,
        }
    }

    pub fn penalty(&self, code: &Code, cluster: &PlantCluster) -> f64 {
        let d = planar_distance(cluster.position(), code.position.xy());
        self.distance_penalty(d) + FRAGMENT_COUNT_WEIGHT * Self::fragment_count_penalty(cluster)
    }

    /// Best candidate around `code`, or a created plant on the code itself.
    pub fn find_plant(&mut self, code: &Code, candidates: &[PlantCluster]) -> Plant {
        let best = candidates
            .iter()
            .map(|c| (c, self.penalty(code, c)))
            .filter(|(_, p)| !p.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((cluster, penalty)) => {
                self.stats.detected += 1;
                let c = cluster.position();
                let mut plant = Plant::detected(
                    Point3::new(c.x, c.y, code.position.z),
                    Some(cluster.bounds),
                    penalty,
                );
                plant.image = cluster.image();
                plant
            }
            None => {
                debug!("no candidate near single code {}, using its position", code.name);
                self.stats.created += 1;
                Plant::created(code.position)
            }
        }
    }
}
