//! Rasterization of surviving shapes into a label image.
//!
//! Shapes are painted in ascending score order with ids `1..=K`, so the
//! highest-scoring shape owns any contested cell unless an overlap label is
//! configured. A cell belongs to a shape when its integer coordinate passes
//! the shape's containment test.

pub mod classes;

use crate::field::{ravel, LabelImage};
use crate::nms::check_parallel;
use crate::shape::{StarGeometry, StarShape};
use crate::trace::{trace_event, trace_span};
use crate::util::math::to_f32;
use crate::util::{StarConvexError, StarConvexResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rasterization parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Label for cells claimed by more than one shape; must exceed the object count.
    pub overlap_label: Option<i32>,
    /// Compute per-shape cell lists on the rayon pool.
    pub parallel: bool,
}

impl RenderConfig {
    /// Validates the config for `objects` shapes.
    pub fn validate(&self, objects: usize) -> StarConvexResult<()> {
        check_parallel(self.parallel)?;
        if objects > i32::MAX as usize {
            return Err(StarConvexError::InvalidInput("too many objects for i32 labels"));
        }
        if let Some(label) = self.overlap_label {
            if i64::from(label) <= objects as i64 {
                return Err(StarConvexError::OverlapLabelCollision { label, objects });
            }
        }
        Ok(())
    }
}

/// Paints `shapes` (ascending score order) into a label image of `shape`.
///
/// Shape `k` receives id `k + 1`.
pub fn paint<S: StarShape<D>, const D: usize>(
    shape: [usize; D],
    shapes: &[S],
    config: &RenderConfig,
) -> StarConvexResult<LabelImage<D>> {
    config.validate(shapes.len())?;
    let mut labels = LabelImage::zeros(shape)?;
    let _span = trace_span!("render_labels", objects = shapes.len()).entered();

    let mut painted = 0usize;
    let mut write = |id: i32, cells: &[usize], out: &mut [i32]| {
        for &cell in cells {
            let slot = &mut out[cell];
            *slot = match config.overlap_label {
                Some(overlap) if *slot != 0 => overlap,
                _ => id,
            };
        }
        painted += cells.len();
    };

    #[cfg(feature = "rayon")]
    if config.parallel {
        let lists: Vec<Vec<usize>> = shapes.par_iter().map(|s| covered_cells(s, shape)).collect();
        for (k, cells) in lists.iter().enumerate() {
            write(k as i32 + 1, cells, labels.as_mut_slice());
        }
        trace_event!("render_labels", painted = painted);
        return Ok(labels);
    }

    let mut cells = Vec::new();
    for (k, s) in shapes.iter().enumerate() {
        cells.clear();
        collect_cells(s, shape, &mut cells);
        write(k as i32 + 1, &cells, labels.as_mut_slice());
    }
    trace_event!("render_labels", painted = painted);
    Ok(labels)
}

/// Builds shapes from `(points, scores, dists)` and paints them, lowest score
/// first.
///
/// `dists` holds `geometry.n_rays()` values per point. Equal scores keep their
/// input order.
pub fn render_labels<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    shape: [usize; D],
    points: &[[usize; D]],
    scores: &[f32],
    dists: &[f32],
    config: &RenderConfig,
) -> StarConvexResult<LabelImage<D>> {
    let n_rays = geometry.n_rays();
    if scores.len() != points.len() {
        return Err(StarConvexError::ShapeMismatch {
            context: "scores",
            expected: vec![points.len()],
            got: vec![scores.len()],
        });
    }
    if dists.len() != points.len() * n_rays {
        return Err(StarConvexError::ShapeMismatch {
            context: "distances",
            expected: vec![points.len(), n_rays],
            got: vec![dists.len()],
        });
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(StarConvexError::InvalidInput("scores must be finite"));
    }
    config.validate(points.len())?;

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let shapes: Vec<G::Shape> = order
        .iter()
        .map(|&i| geometry.shape(to_f32(points[i]), &dists[i * n_rays..(i + 1) * n_rays]))
        .collect();
    paint(shape, &shapes, config)
}

#[cfg(feature = "rayon")]
fn covered_cells<S: StarShape<D>, const D: usize>(s: &S, shape: [usize; D]) -> Vec<usize> {
    let mut cells = Vec::new();
    collect_cells(s, shape, &mut cells);
    cells
}

/// Appends the flat indices of all grid cells inside `s`.
fn collect_cells<S: StarShape<D>, const D: usize>(s: &S, shape: [usize; D], out: &mut Vec<usize>) {
    let Some((lo, hi)) = s.bounds().cell_range(shape) else {
        return;
    };
    let mut pos = lo;
    loop {
        if s.contains(to_f32(pos)) {
            if let Some(flat) = ravel(shape, pos) {
                out.push(flat);
            }
        }
        let mut axis = D;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            pos[axis] += 1;
            if pos[axis] < hi[axis] {
                break;
            }
            pos[axis] = lo[axis];
        }
    }
}
