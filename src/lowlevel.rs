//! Low-level building blocks for custom pipelines.
//!
//! These expose the overlap predicate, the painter that takes prebuilt shapes,
//! and the grid check used by [`crate::instances`]. Most users should prefer
//! [`crate::instances()`], [`crate::suppress`] and [`crate::render_labels`].

pub use crate::instances::check_grid;
pub use crate::overlap::{conflicts, overlap, OverlapMeasure};
pub use crate::render::paint;
pub use crate::shape::{Bounds, StarGeometry, StarShape};
