/// Errors raised while assembling the field topology.
///
/// Only [`TopologyError::NoRowCodes`], [`TopologyError::NoRows`] and
/// [`TopologyError::UnsupportedTopology`] abort a build. The others are
/// produced for one row, pass or code group; the builder logs them, drops
/// the offending input and counts it in the report.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("no row codes found")]
    NoRowCodes,
    #[error("no complete rows could be assembled")]
    NoRows,
    #[error("pass {pass}: {reason}")]
    Pairing { pass: u32, reason: String },
    #[error("row {row}: found {count} boundary codes, expected 2")]
    RowCodeCount { row: u32, count: usize },
    #[error("pass {pass} holds {count} rows, at most 2 supported")]
    PassTooLarge { pass: u32, count: usize },
    #[error("row {row} has no up/back direction in the direction table")]
    UncoveredRow { row: u32 },
    #[error("codes '{first}' and '{second}' are not aligned with the field direction")]
    Orientation { first: String, second: String },
    #[error("{segments} segments span a whole row between two row codes")]
    UnsupportedTopology { segments: usize },
}

impl TopologyError {
    /// True for the errors that describe a row or pass count mismatch.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            TopologyError::RowCodeCount { .. }
                | TopologyError::PassTooLarge { .. }
                | TopologyError::UncoveredRow { .. }
        )
    }
}
