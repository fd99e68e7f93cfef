/// Errors returned by the plant localizer.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocalizeError {
    #[error("segment start and end coincide")]
    DegenerateSegment,
    #[error("segment must end at a code, found a plant")]
    SegmentEndsWithPlant,
}
