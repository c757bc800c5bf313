//! Errors raised while turning a frame into feature vectors.

use thiserror::Error;

/// Errors that can occur during filtering, SAT construction or block extraction.
///
/// Both variants are fatal for the frame being processed. The caller decides
/// whether to skip the frame or abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Empty buffer, zero dimension, or a buffer whose length does not match
    /// its declared dimensions.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A block's border windows would read outside the plane.
    #[error("block ({row}, {col}) border windows fall outside the {width}x{height} plane")]
    Bounds {
        /// Block row index.
        row: usize,
        /// Block column index.
        col: usize,
        /// Plane width in pixels.
        width: usize,
        /// Plane height in pixels.
        height: usize,
    },
}

impl ExtractionError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}
