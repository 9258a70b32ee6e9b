//! Greedy non-maximum suppression over star-convex shapes.
//!
//! Candidates are visited by descending score. Each unsuppressed candidate is
//! kept and suppresses every lower-ranked, still-active candidate it conflicts
//! with. Neighbours come from a bucket grid sized by the largest shape radius,
//! so only shapes whose bounding balls can touch are ever compared.

use std::sync::OnceLock;

use crate::candidate::spatial::SpatialIndex;
use crate::candidate::{validate_unit, Candidates};
use crate::overlap::{conflicts, OverlapMeasure};
use crate::shape::{StarGeometry, StarShape};
use crate::trace::{trace_event, trace_span};
use crate::util::math::to_f32;
use crate::util::{StarConvexError, StarConvexResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Suppression parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Candidates overlapping a kept shape by more than this are suppressed.
    pub nms_thresh: f32,
    /// Overlap normalization.
    pub measure: OverlapMeasure,
    /// Build shapes and test conflicts on the rayon pool.
    pub parallel: bool,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            nms_thresh: 0.4,
            measure: OverlapMeasure::Iou,
            parallel: false,
        }
    }
}

impl NmsConfig {
    /// Validates the threshold and the parallel flag.
    pub fn validate(&self) -> StarConvexResult<()> {
        validate_unit("nms_thresh", self.nms_thresh)?;
        check_parallel(self.parallel)
    }
}

/// Rejects `parallel = true` when the crate was built without rayon.
pub(crate) fn check_parallel(parallel: bool) -> StarConvexResult<()> {
    if parallel && !cfg!(feature = "rayon") {
        return Err(StarConvexError::NotSupported(
            "parallel execution requires the `rayon` feature",
        ));
    }
    Ok(())
}

/// Surviving candidates, ordered by ascending score.
///
/// Entry `k` receives label `k + 1` when rasterized. The order is the exact
/// reverse of the order in which candidates were kept.
#[derive(Clone, Debug)]
pub struct SuppressionResult<S, const D: usize> {
    /// Indices into the candidate list.
    pub indices: Vec<usize>,
    /// Centers in output-image coordinates.
    pub points: Vec<[usize; D]>,
    /// Scores.
    pub scores: Vec<f32>,
    /// Distance vectors.
    pub dists: Vec<Vec<f32>>,
    /// Shapes, reused for rasterization.
    pub shapes: Vec<S>,
}

impl<S, const D: usize> SuppressionResult<S, D> {
    /// Number of survivors.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if nothing survived.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Runs greedy NMS over `candidates`.
pub fn suppress<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    candidates: &Candidates<'_, D>,
    config: &NmsConfig,
) -> StarConvexResult<SuppressionResult<G::Shape, D>> {
    config.validate()?;
    if candidates.n_rays() != geometry.n_rays() {
        return Err(StarConvexError::ShapeMismatch {
            context: "distance channels",
            expected: vec![geometry.n_rays()],
            got: vec![candidates.n_rays()],
        });
    }

    let _span = trace_span!("suppress", candidates = candidates.len()).entered();
    let order = candidates.priority_order();
    let mut shapes = LazyShapes::new(geometry, candidates);
    let kept = greedy(&mut shapes, &order, config);

    let mut result = SuppressionResult {
        indices: Vec::with_capacity(kept.len()),
        points: Vec::with_capacity(kept.len()),
        scores: Vec::with_capacity(kept.len()),
        dists: Vec::with_capacity(kept.len()),
        shapes: Vec::with_capacity(kept.len()),
    };
    for &idx in kept.iter().rev() {
        result.indices.push(idx);
        result.points.push(candidates.points()[idx]);
        result.scores.push(candidates.scores()[idx]);
        result.dists.push(candidates.dist(idx).to_vec());
        result.shapes.push(shapes.take(idx));
    }
    Ok(result)
}

/// Shapes built on first use.
///
/// A candidate suppressed before any pairwise test never gets a shape, and a
/// suppressed shape is dropped as soon as it loses.
struct LazyShapes<'c, 'a, G: StarGeometry<D>, const D: usize> {
    geometry: &'c G,
    candidates: &'c Candidates<'a, D>,
    centers: Vec<[f32; D]>,
    radii: Vec<f32>,
    slots: Vec<OnceLock<G::Shape>>,
}

impl<'c, 'a, G: StarGeometry<D>, const D: usize> LazyShapes<'c, 'a, G, D> {
    fn new(geometry: &'c G, candidates: &'c Candidates<'a, D>) -> Self {
        let n = candidates.len();
        Self {
            geometry,
            candidates,
            centers: candidates.points().iter().map(|&p| to_f32(p)).collect(),
            radii: (0..n).map(|i| geometry.radius(candidates.dist(i))).collect(),
            slots: (0..n).map(|_| OnceLock::new()).collect(),
        }
    }

    fn get(&self, idx: usize) -> &G::Shape {
        self.slots[idx].get_or_init(|| {
            self.geometry
                .shape(self.centers[idx], self.candidates.dist(idx))
        })
    }

    fn drop_shape(&mut self, idx: usize) {
        self.slots[idx].take();
    }

    fn take(&mut self, idx: usize) -> G::Shape {
        match self.slots[idx].take() {
            Some(shape) => shape,
            None => self
                .geometry
                .shape(self.centers[idx], self.candidates.dist(idx)),
        }
    }

    fn built(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }
}

/// Returns kept indices in keep order (descending priority).
fn greedy<G: StarGeometry<D>, const D: usize>(
    shapes: &mut LazyShapes<'_, '_, G, D>,
    order: &[usize],
    config: &NmsConfig,
) -> Vec<usize> {
    let n = order.len();
    let mut rank = vec![0usize; n];
    for (pos, &idx) in order.iter().enumerate() {
        rank[idx] = pos;
    }
    let r_max = shapes.radii.iter().copied().fold(0.0f32, f32::max);
    let index = SpatialIndex::build(&shapes.centers, r_max);

    let mut suppressed = vec![false; n];
    let mut kept = Vec::new();
    let mut neighbors = Vec::new();
    let mut pair_tests = 0usize;
    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        kept.push(i);

        neighbors.clear();
        index.for_each_near(shapes.centers[i], shapes.radii[i] + r_max, |j| {
            if rank[j] > pos && !suppressed[j] {
                neighbors.push(j);
            }
        });
        if neighbors.is_empty() {
            continue;
        }
        let lazy = &*shapes;
        let shape = lazy.get(i);
        if shape.measure() <= 0.0 {
            continue;
        }
        pair_tests += neighbors.len();

        let thresh = config.nms_thresh;
        let measure = config.measure;
        let hit = |j: &usize| conflicts(shape, lazy.get(*j), measure, thresh);
        #[cfg(feature = "rayon")]
        let losers: Vec<usize> = if config.parallel {
            neighbors.par_iter().copied().filter(hit).collect()
        } else {
            neighbors.iter().copied().filter(hit).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let losers: Vec<usize> = neighbors.iter().copied().filter(hit).collect();

        for j in losers {
            suppressed[j] = true;
            shapes.drop_shape(j);
        }
    }
    trace_event!(
        "suppress",
        kept = kept.len(),
        pair_tests = pair_tests,
        shapes_alive = shapes.built()
    );
    kept
}
