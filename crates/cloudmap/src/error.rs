use thiserror::Error;

/// Rejections raised while turning a raw payload into a [`Dataset`](crate::Dataset).
///
/// These only occur at the ingestion boundary. Once points are inside the
/// engine, bad configuration is clamped and empty data is a valid state.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed dataset payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("point {index} has an empty subreddit name")]
    EmptyName { index: usize },

    #[error("subreddit {name:?} appears at both {first} and {second}")]
    DuplicateName {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("point {index} ({name}): coordinate {axis} = {value} is not finite")]
    NonFinite {
        index: usize,
        name: String,
        axis: char,
        value: f32,
    },

    #[error(
        "point {index} ({name}): coordinate {axis} = {value} lies outside the domain [-{half_extent}, {half_extent}]"
    )]
    OutOfDomain {
        index: usize,
        name: String,
        axis: char,
        value: f32,
        half_extent: f32,
    },

    #[error("point {index} ({name}): percentNsfw {value} is outside [0, 100]")]
    NsfwPercent {
        index: usize,
        name: String,
        value: f32,
    },

    #[error("point {index} ({name}): {found} cluster labels, expected {expected}")]
    ClusterArity {
        index: usize,
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("point {index} ({name}): cluster label {label} is out of range for {count} clusters")]
    ClusterLabel {
        index: usize,
        name: String,
        label: u32,
        count: u32,
    },

    #[error("cluster count index {index} is out of range ({available} available)")]
    ClusterIndex { index: usize, available: usize },
}
