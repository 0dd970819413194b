//! Split-pane layout engine
//!
//! A workspace's terminals are arranged in a tree of splits, like a tiling
//! window manager. Invariants kept by every mutation:
//!
//! - every split has at least two children and one size per child
//! - the sizes of a split add up to 100
//! - a terminal id appears in at most one leaf
//!
//! Tree walks use explicit stacks, and `split` refuses to nest deeper than
//! a configured maximum, so hostile split sequences cannot blow the stack.

mod engine;
mod node;
mod ops;


pub use engine::{LayoutEngine, Placement};
pub use node::{PaneNode, Rect, SIZE_EPSILON, SplitDirection};
pub use ops::{DEFAULT_MAX_DEPTH, LayoutError, bounds, close, split, validate};
