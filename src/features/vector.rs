//! Feature vector layout.
//!
//! ```text
//! [0..4)     block body: vertical mean, vertical variance,
//!            horizontal mean, horizontal variance
//! [4..68)    vertical plane,   borders left, top, right, bottom
//! [68..132)  horizontal plane, borders left, top, right, bottom
//!
//! each border (16 values):
//!     mean[2,4,8,16] variance[2,4,8,16]
//!     (mean - body mean)[2,4,8,16] (variance - body variance)[2,4,8,16]
//! ```
//!
//! Trained models depend on this exact order.

/// Half-depths of the border windows; full depths are 2, 4, 8 and 16 px.
pub const HALF_DEPTHS: [usize; SCALES] = [1, 2, 4, 8];
/// Number of window depths per border.
pub const SCALES: usize = 4;
/// Deepest reach of a border window on either side of the block edge.
pub const MAX_HALF_DEPTH: usize = 8;
/// Values emitted per border.
pub const VALUES_PER_BORDER: usize = 4 * SCALES;
/// Values describing the block body of both planes.
pub const BODY_VALUES: usize = 4;
/// Values emitted per filter direction.
pub const VALUES_PER_DIRECTION: usize = 4 * VALUES_PER_BORDER;
/// Length of every feature vector.
pub const FEATURE_VECTOR_LEN: usize = BODY_VALUES + 2 * VALUES_PER_DIRECTION;

/// Which difference plane a value was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Row differences.
    Vertical,
    /// Column differences.
    Horizontal,
}

impl Direction {
    /// Directions in layout order.
    pub const ALL: [Direction; 2] = [Direction::Vertical, Direction::Horizontal];

    #[inline]
    fn ordinal(self) -> usize {
        match self {
            Direction::Vertical => 0,
            Direction::Horizontal => 1,
        }
    }
}

/// Side of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Border {
    /// Left edge.
    Left,
    /// Top edge.
    Top,
    /// Right edge.
    Right,
    /// Bottom edge.
    Bottom,
}

impl Border {
    /// Borders in layout order.
    pub const ALL: [Border; 4] = [Border::Left, Border::Top, Border::Right, Border::Bottom];

    #[inline]
    fn ordinal(self) -> usize {
        match self {
            Border::Left => 0,
            Border::Top => 1,
            Border::Right => 2,
            Border::Bottom => 3,
        }
    }
}

/// Statistic kind within a border's 16 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderStat {
    /// Window mean.
    Mean,
    /// Window population variance.
    Variance,
    /// Window mean minus block body mean.
    MeanDelta,
    /// Window variance minus block body variance.
    VarianceDelta,
}

impl BorderStat {
    #[inline]
    fn ordinal(self) -> usize {
        match self {
            BorderStat::Mean => 0,
            BorderStat::Variance => 1,
            BorderStat::MeanDelta => 2,
            BorderStat::VarianceDelta => 3,
        }
    }
}

/// Maps semantic positions to slots of a [`FeatureVector`].
pub struct FeatureLayout;

impl FeatureLayout {
    /// Slot of a border statistic. `scale` indexes [`HALF_DEPTHS`].
    ///
    /// Panics if `scale >= SCALES`.
    pub fn index(direction: Direction, border: Border, stat: BorderStat, scale: usize) -> usize {
        assert!(scale < SCALES, "scale {} out of range", scale);
        BODY_VALUES
            + direction.ordinal() * VALUES_PER_DIRECTION
            + border.ordinal() * VALUES_PER_BORDER
            + stat.ordinal() * SCALES
            + scale
    }

    /// Slot of the block body mean.
    pub fn body_mean(direction: Direction) -> usize {
        2 * direction.ordinal()
    }

    /// Slot of the block body variance.
    pub fn body_variance(direction: Direction) -> usize {
        2 * direction.ordinal() + 1
    }
}

/// The 132 statistics of one block.
#[derive(Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_VECTOR_LEN]);

impl FeatureVector {
    /// Wraps raw values already in layout order.
    pub fn from_array(values: [f32; FEATURE_VECTOR_LEN]) -> Self {
        Self(values)
    }

    /// All values in layout order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Always [`FEATURE_VECTOR_LEN`].
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// One border statistic.
    #[inline]
    pub fn get(&self, direction: Direction, border: Border, stat: BorderStat, scale: usize) -> f32 {
        self.0[FeatureLayout::index(direction, border, stat, scale)]
    }

    /// Mean of the block body.
    #[inline]
    pub fn block_mean(&self, direction: Direction) -> f32 {
        self.0[FeatureLayout::body_mean(direction)]
    }

    /// Variance of the block body.
    #[inline]
    pub fn block_variance(&self, direction: Direction) -> f32 {
        self.0[FeatureLayout::body_variance(direction)]
    }

    /// Consumes the vector, returning the raw values.
    pub fn into_array(self) -> [f32; FEATURE_VECTOR_LEN] {
        self.0
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl std::fmt::Debug for FeatureVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureVector")
            .field("vertical_mean", &self.block_mean(Direction::Vertical))
            .field("vertical_variance", &self.block_variance(Direction::Vertical))
            .field("horizontal_mean", &self.block_mean(Direction::Horizontal))
            .field("horizontal_variance", &self.block_variance(Direction::Horizontal))
            .finish_non_exhaustive()
    }
}
