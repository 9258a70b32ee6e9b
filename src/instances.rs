//! End-to-end instance extraction from a dense prediction.

use crate::candidate::{Candidates, SelectConfig};
use crate::field::{FieldView, LabelImage};
use crate::nms::{suppress, NmsConfig};
use crate::render::classes::class_votes;
use crate::render::{paint, RenderConfig};
use crate::shape::{StarGeometry, StarShape};
use crate::trace::{trace_event, trace_span};
use crate::util::{StarConvexError, StarConvexResult};

/// Parameters for [`instances`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InstanceConfig<const D: usize> {
    /// Candidate selection.
    pub select: SelectConfig<D>,
    /// Suppression.
    pub nms: NmsConfig,
    /// Rasterization.
    pub render: RenderConfig,
}

impl<const D: usize> InstanceConfig<D> {
    /// Validates all stages that do not depend on the object count.
    pub fn validate(&self) -> StarConvexResult<()> {
        self.select.validate()?;
        self.nms.validate()?;
        self.render.validate(0)
    }
}

/// Label image plus per-object metadata.
///
/// Every list is aligned with the label ids: entry `k` describes label `k + 1`,
/// in ascending score order.
#[derive(Clone, Debug, PartialEq)]
pub struct Instances<const D: usize> {
    /// Label image at full image resolution.
    pub labels: LabelImage<D>,
    /// Object centers in image coordinates.
    pub points: Vec<[usize; D]>,
    /// Shape vertices in image coordinates, in ray order.
    pub coord: Vec<Vec<[f32; D]>>,
    /// Object scores.
    pub prob: Vec<f32>,
    /// Distance vectors.
    pub dist: Vec<Vec<f32>>,
    /// Mean class probabilities per object, when a class map was given.
    pub class_prob: Option<Vec<Vec<f32>>>,
}

impl<const D: usize> Instances<D> {
    /// Number of objects.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no object was found.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Turns dense probability and distance maps into labeled instances.
///
/// `prob` and `dist` live on the prediction grid; each axis must have
/// `ceil(img_shape / grid)` cells. `class_prob`, if given, may have any
/// spatial shape and is resampled to `img_shape`.
pub fn instances<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    img_shape: [usize; D],
    prob: FieldView<'_, f32, D>,
    dist: FieldView<'_, f32, D>,
    class_prob: Option<FieldView<'_, f32, D>>,
    config: &InstanceConfig<D>,
) -> StarConvexResult<Instances<D>> {
    config.validate()?;
    check_grid(img_shape, prob.shape(), config.select.grid)?;
    if dist.channels() != geometry.n_rays() {
        return Err(StarConvexError::ShapeMismatch {
            context: "distance channels",
            expected: vec![geometry.n_rays()],
            got: vec![dist.channels()],
        });
    }

    let _span = trace_span!("instances", positions = prob.len()).entered();
    let candidates = Candidates::from_dense(prob, dist, &config.select)?;
    let kept = suppress(geometry, &candidates, &config.nms)?;
    let labels = paint(img_shape, &kept.shapes, &config.render)?;
    let class_prob = match class_prob {
        Some(map) => Some(class_votes(&labels, map, &kept.points)?),
        None => None,
    };
    trace_event!("instances", candidates = candidates.len(), objects = kept.len());

    Ok(Instances {
        coord: kept.shapes.iter().map(|s| s.vertices().to_vec()).collect(),
        labels,
        points: kept.points,
        prob: kept.scores,
        dist: kept.dists,
        class_prob,
    })
}

/// Checks that a prediction of `pred_shape` covers `img_shape` at `grid`.
pub fn check_grid<const D: usize>(
    img_shape: [usize; D],
    pred_shape: [usize; D],
    grid: [usize; D],
) -> StarConvexResult<()> {
    for axis in 0..D {
        if grid[axis] == 0 {
            return Err(StarConvexError::InvalidGrid {
                grid: grid.to_vec(),
                reason: "grid factors must be >= 1",
            });
        }
        if img_shape[axis] == 0 || pred_shape[axis] != img_shape[axis].div_ceil(grid[axis]) {
            return Err(StarConvexError::InvalidGrid {
                grid: grid.to_vec(),
                reason: "prediction shape must equal ceil(image shape / grid)",
            });
        }
    }
    Ok(())
}
