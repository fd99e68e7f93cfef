use fieldmap_plants::LocalizeError;
use fieldmap_topology::TopologyError;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("segment {segment}: {source}")]
    Localize {
        segment: usize,
        #[source]
        source: LocalizeError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
