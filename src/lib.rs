//! Starconvex turns star-convex shape predictions into instance label images.
//!
//! A prediction assigns every candidate center a score and one boundary
//! distance per fixed ray. The crate selects candidates from dense maps or
//! sparse lists, removes overlapping duplicates with greedy non-maximum
//! suppression, and paints the survivors into a label image. Both 2D polygons
//! and 3D polyhedra are supported; optional parallelism comes from the `rayon`
//! feature and stage spans from the `tracing` feature.

pub mod candidate;
pub mod field;
pub mod instances;
pub mod lowlevel;
pub mod nms;
pub mod overlap;
pub mod rays;
pub mod render;
pub mod shape;
mod trace;
pub mod util;

pub use candidate::{Border, Candidates, SelectConfig};
pub use field::{FieldView, LabelImage};
pub use instances::{instances, InstanceConfig, Instances};
pub use nms::{suppress, NmsConfig, SuppressionResult};
pub use overlap::OverlapMeasure;
pub use rays::{golden_spiral, golden_spiral_anisotropic, polar, Rays2D, Rays3D, MAX_RAYS};
pub use render::classes::class_votes;
pub use render::{render_labels, RenderConfig};
pub use shape::{Polygon, Polyhedron, StarGeometry, StarShape};
pub use util::{StarConvexError, StarConvexResult};
