//! Per-block statistics over the summed-area tables of a frame.
//!
//! For every block the extractor reads the block body and four windows
//! along each of its four borders, on both difference planes, and emits a
//! fixed 132-value [`FeatureVector`].

mod block;
mod border;
mod vector;

pub use block::{extract_block_features, BlockCoordinate, BlockFeatureExtractor};
pub use border::{BorderStatistics, Moments};
pub use vector::{
    Border, BorderStat, Direction, FeatureLayout, FeatureVector, BODY_VALUES,
    FEATURE_VECTOR_LEN, HALF_DEPTHS, MAX_HALF_DEPTH, SCALES, VALUES_PER_BORDER,
    VALUES_PER_DIRECTION,
};
