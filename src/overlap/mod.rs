//! Overlap predicate between a kept shape and a candidate.
//!
//! Two stages: a conservative screen (bounding balls, bounding boxes, and an
//! upper bound on the intersection from the ball lens) followed by the shape's
//! intersection measure. [`conflicts`] is exactly `overlap(..) > thresh`; the
//! screen only skips work whose outcome is already decided.

pub(crate) mod clip;
pub(crate) mod quadrature;

use crate::shape::StarShape;
use crate::util::math::dist_sq;

/// How an intersection is normalized into an overlap fraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapMeasure {
    /// Intersection over union.
    #[default]
    Iou,
    /// Intersection over the measure of the smaller shape.
    OverSmaller,
}

impl OverlapMeasure {
    /// Normalizes an intersection measure; degenerate shapes give `0`.
    pub fn fraction(self, inter: f32, measure_a: f32, measure_b: f32) -> f32 {
        if inter <= 0.0 || measure_a <= 0.0 || measure_b <= 0.0 {
            return 0.0;
        }
        let denom = match self {
            OverlapMeasure::Iou => measure_a + measure_b - inter,
            OverlapMeasure::OverSmaller => measure_a.min(measure_b),
        };
        if denom <= 0.0 {
            return 0.0;
        }
        (inter / denom).min(1.0)
    }
}

/// Upper bound on the intersection, or `None` when the shapes cannot overlap.
fn screen<S: StarShape<D>, const D: usize>(a: &S, b: &S) -> Option<f32> {
    let (ma, mb) = (a.measure(), b.measure());
    if ma <= 0.0 || mb <= 0.0 {
        return None;
    }
    let reach = a.radius() + b.radius();
    let d_sq = dist_sq(a.center(), b.center());
    if d_sq >= reach * reach || !a.bounds().intersects(&b.bounds()) {
        return None;
    }
    Some(S::ball_intersection(a.radius(), b.radius(), d_sq.sqrt()).min(ma.min(mb)))
}

/// Overlap fraction of `candidate` against `kept`.
pub fn overlap<S: StarShape<D>, const D: usize>(
    kept: &S,
    candidate: &S,
    measure: OverlapMeasure,
) -> f32 {
    let Some(cap) = screen(kept, candidate) else {
        return 0.0;
    };
    let inter = kept.intersection(candidate).min(cap);
    measure.fraction(inter, kept.measure(), candidate.measure())
}

/// Returns true if `candidate` overlaps `kept` by more than `thresh`.
pub fn conflicts<S: StarShape<D>, const D: usize>(
    kept: &S,
    candidate: &S,
    measure: OverlapMeasure,
    thresh: f32,
) -> bool {
    let Some(cap) = screen(kept, candidate) else {
        return false;
    };
    let (ma, mb) = (kept.measure(), candidate.measure());
    if measure.fraction(cap, ma, mb) <= thresh {
        return false;
    }
    let inter = kept.intersection(candidate).min(cap);
    measure.fraction(inter, ma, mb) > thresh
}
