//! Candidate selection.
//!
//! Both input modes funnel into [`Candidates`]: a list of integer center
//! positions with one score each and a row of `n_rays` distances borrowed from
//! a shared buffer. Dense predictions go through [`Candidates::from_dense`]
//! (threshold, border margins, grid upscaling); sparse predictions go through
//! [`Candidates::from_sparse`] unchanged. Everything downstream is identical
//! for the two modes.

pub(crate) mod spatial;

use std::cmp::Ordering;

use crate::field::{unravel, FieldView};
use crate::trace::{trace_event, trace_span};
use crate::util::{StarConvexError, StarConvexResult};

/// Margins excluded from dense selection, as `(low, high)` cells per axis.
///
/// Margins are counted on the probability grid, before upscaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Border<const D: usize> {
    /// Per-axis `(low, high)` margins.
    pub margins: [(usize, usize); D],
}

impl<const D: usize> Border<D> {
    /// No exclusion zone.
    pub fn none() -> Self {
        Self {
            margins: [(0, 0); D],
        }
    }

    /// Same margin on both sides of every axis.
    pub fn uniform(width: usize) -> Self {
        Self {
            margins: [(width, width); D],
        }
    }

    /// Returns true if `pos` lies outside the margins of `shape`.
    #[inline]
    pub fn admits(&self, shape: [usize; D], pos: [usize; D]) -> bool {
        for axis in 0..D {
            let (lo, hi) = self.margins[axis];
            if pos[axis] < lo || pos[axis] + hi >= shape[axis] {
                return false;
            }
        }
        true
    }
}

impl<const D: usize> Default for Border<D> {
    fn default() -> Self {
        Self::none()
    }
}

/// Dense candidate selection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectConfig<const D: usize> {
    /// Positions with probability strictly above this value become candidates.
    pub prob_thresh: f32,
    /// Subsampling factor per axis between the prediction and the image.
    pub grid: [usize; D],
    /// Margins excluded from selection.
    pub border: Border<D>,
    /// Optional cap on the number of candidates.
    ///
    /// Suppression holds a center and a radius per candidate; full shapes
    /// exist only for candidates that take part in a pairwise test, and are
    /// released once suppressed.
    pub max_candidates: Option<usize>,
}

impl<const D: usize> Default for SelectConfig<D> {
    fn default() -> Self {
        Self {
            prob_thresh: 0.5,
            grid: [1; D],
            border: Border::none(),
            max_candidates: None,
        }
    }
}

impl<const D: usize> SelectConfig<D> {
    /// Validates threshold and grid values.
    pub fn validate(&self) -> StarConvexResult<()> {
        validate_unit("prob_thresh", self.prob_thresh)?;
        if self.grid.iter().any(|&g| g == 0) {
            return Err(StarConvexError::InvalidGrid {
                grid: self.grid.to_vec(),
                reason: "grid factors must be >= 1",
            });
        }
        Ok(())
    }
}

/// Checks that a threshold is a finite value in `[0, 1]`.
pub(crate) fn validate_unit(name: &'static str, value: f32) -> StarConvexResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(StarConvexError::InvalidThreshold { name, value });
    }
    Ok(())
}

/// Selected candidates sharing one distance buffer.
#[derive(Clone, Debug)]
pub struct Candidates<'a, const D: usize> {
    points: Vec<[usize; D]>,
    scores: Vec<f32>,
    rows: Vec<usize>,
    dist: &'a [f32],
    n_rays: usize,
}

impl<'a, const D: usize> Candidates<'a, D> {
    /// Selects candidates from dense probability and distance maps.
    ///
    /// `prob` must have one channel and `dist` the same spatial shape with one
    /// channel per ray. Positions are visited in row-major order; a candidate's
    /// point is its position multiplied by `config.grid`.
    pub fn from_dense(
        prob: FieldView<'a, f32, D>,
        dist: FieldView<'a, f32, D>,
        config: &SelectConfig<D>,
    ) -> StarConvexResult<Self> {
        config.validate()?;
        if prob.channels() != 1 {
            return Err(StarConvexError::InvalidInput(
                "probability map must have a single channel",
            ));
        }
        if dist.shape() != prob.shape() {
            return Err(StarConvexError::ShapeMismatch {
                context: "distance map",
                expected: prob.shape().to_vec(),
                got: dist.shape().to_vec(),
            });
        }

        let _span = trace_span!("select_candidates", positions = prob.len()).entered();
        let shape = prob.shape();
        let n_rays = dist.channels();
        let mut points = Vec::new();
        let mut scores = Vec::new();
        let mut rows = Vec::new();
        for (flat, &p) in prob.as_slice().iter().enumerate() {
            let selected = p > config.prob_thresh;
            if !selected {
                continue;
            }
            let pos = unravel(shape, flat);
            if !config.border.admits(shape, pos) {
                continue;
            }
            let mut point = pos;
            for axis in 0..D {
                point[axis] *= config.grid[axis];
            }
            points.push(point);
            scores.push(p);
            rows.push(flat * n_rays);
        }
        if let Some(limit) = config.max_candidates {
            if points.len() > limit {
                return Err(StarConvexError::TooManyCandidates {
                    count: points.len(),
                    limit,
                });
            }
        }
        trace_event!("select_candidates", selected = points.len());

        Ok(Self {
            points,
            scores,
            rows,
            dist: dist.as_slice(),
            n_rays,
        })
    }

    /// Wraps sparse predictions: candidate `i` has center `points[i]`, score
    /// `scores[i]` and distances `dist[i * n_rays..(i + 1) * n_rays]`.
    ///
    /// No thresholding is applied.
    pub fn from_sparse(
        points: &[[usize; D]],
        scores: &[f32],
        dist: &'a [f32],
        n_rays: usize,
    ) -> StarConvexResult<Self> {
        if n_rays == 0 {
            return Err(StarConvexError::InvalidRays {
                n_rays,
                reason: "distance rows must not be empty",
            });
        }
        if scores.len() != points.len() {
            return Err(StarConvexError::ShapeMismatch {
                context: "scores",
                expected: vec![points.len()],
                got: vec![scores.len()],
            });
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(StarConvexError::InvalidInput("scores must be finite"));
        }
        let needed = points
            .len()
            .checked_mul(n_rays)
            .ok_or(StarConvexError::InvalidInput("distance buffer size overflows"))?;
        if dist.len() != needed {
            return Err(StarConvexError::ShapeMismatch {
                context: "distances",
                expected: vec![points.len(), n_rays],
                got: vec![dist.len()],
            });
        }
        Ok(Self {
            points: points.to_vec(),
            scores: scores.to_vec(),
            rows: (0..points.len()).map(|i| i * n_rays).collect(),
            dist,
            n_rays,
        })
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no candidate was selected.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distances per candidate.
    pub fn n_rays(&self) -> usize {
        self.n_rays
    }

    /// Candidate centers in output-image coordinates.
    pub fn points(&self) -> &[[usize; D]] {
        &self.points
    }

    /// Candidate scores.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Distance row of candidate `idx`.
    pub fn dist(&self, idx: usize) -> &'a [f32] {
        let start = self.rows[idx];
        &self.dist[start..start + self.n_rays]
    }

    /// Candidate indices by descending score, ties broken by ascending index.
    pub fn priority_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| priority_cmp(&self.scores, a, b));
        order
    }
}

fn priority_cmp(scores: &[f32], a: usize, b: usize) -> Ordering {
    scores[b].total_cmp(&scores[a]).then_with(|| a.cmp(&b))
}
