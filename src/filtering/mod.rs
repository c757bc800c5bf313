//! Frame filtering and prefix-sum construction.
//!
//! A frame is turned into two absolute-difference planes, and each plane
//! into a pair of summed-area tables. Each pass depends on the complete
//! output of the previous one.

mod edge;
mod plane;
mod sat;

pub use edge::{EdgeFilter, EdgePlanes};
pub use plane::{Plane, Sample};
pub use sat::{SummedAreaTable, WindowSums};
