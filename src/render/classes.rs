//! Per-object class probabilities from a rendered label image.

use crate::field::{ravel, unravel, FieldView, LabelImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{StarConvexError, StarConvexResult};

/// Averages `class_prob` over the cells of each object.
///
/// `points[k]` is the center of the object with label `k + 1`. The class map
/// may be coarser than the label image; it is resampled by nearest neighbour.
/// An object with no remaining cells takes the class vector at its center.
pub fn class_votes<const D: usize>(
    labels: &LabelImage<D>,
    class_prob: FieldView<'_, f32, D>,
    points: &[[usize; D]],
) -> StarConvexResult<Vec<Vec<f32>>> {
    let out_shape = labels.shape();
    let in_shape = class_prob.shape();
    let n_classes = class_prob.channels();
    let objects = points.len();
    let _span = trace_span!("class_vote", objects = objects, classes = n_classes).entered();

    let lookup: Vec<Vec<usize>> = (0..D)
        .map(|axis| {
            (0..out_shape[axis])
                .map(|o| nearest(o, in_shape[axis], out_shape[axis]))
                .collect()
        })
        .collect();
    let source = |pos: [usize; D]| {
        let mut src = [0usize; D];
        for axis in 0..D {
            let o = pos[axis].min(out_shape[axis] - 1);
            src[axis] = lookup[axis][o];
        }
        let flat = ravel(in_shape, src).unwrap_or(class_prob.len());
        class_prob
            .at(flat)
            .ok_or(StarConvexError::IndexOutOfBounds {
                index: flat,
                len: class_prob.len(),
                context: "class probability map",
            })
    };

    let mut sums = vec![0.0f64; objects * n_classes];
    let mut counts = vec![0usize; objects];
    for (flat, &label) in labels.as_slice().iter().enumerate() {
        if label < 1 || label as usize > objects {
            continue;
        }
        let k = label as usize - 1;
        let values = source(unravel(out_shape, flat))?;
        for (acc, &v) in sums[k * n_classes..(k + 1) * n_classes].iter_mut().zip(values) {
            *acc += f64::from(v);
        }
        counts[k] += 1;
    }

    let mut votes = Vec::with_capacity(objects);
    let mut empty = 0usize;
    for k in 0..objects {
        if counts[k] == 0 {
            empty += 1;
            votes.push(source(points[k])?.to_vec());
            continue;
        }
        let n = counts[k] as f64;
        votes.push(
            sums[k * n_classes..(k + 1) * n_classes]
                .iter()
                .map(|&s| (s / n) as f32)
                .collect(),
        );
    }
    trace_event!("class_vote", empty = empty);
    Ok(votes)
}

/// Source index along one axis for nearest-neighbour resampling.
fn nearest(o: usize, input: usize, output: usize) -> usize {
    if output <= 1 || input <= 1 {
        return 0;
    }
    let scale = (input - 1) as f64 / (output - 1) as f64;
    ((o as f64 * scale).round() as usize).min(input - 1)
}

#[cfg(test)]
mod tests {
    use super::{class_votes, nearest};
    use crate::field::{FieldView, LabelImage};

    #[test]
    fn nearest_maps_endpoints() {
        assert_eq!(nearest(0, 4, 8), 0);
        assert_eq!(nearest(7, 4, 8), 3);
        assert_eq!(nearest(3, 1, 8), 0);
    }

    #[test]
    fn votes_average_over_object_cells() {
        let mut labels = LabelImage::zeros([2, 2]).unwrap();
        labels.as_mut_slice().copy_from_slice(&[1, 1, 0, 2]);
        let probs = [0.2f32, 0.8, 0.4, 0.6, 0.0, 1.0, 0.9, 0.1];
        let class_prob = FieldView::new(&probs, [2, 2], 2).unwrap();
        let votes = class_votes(&labels, class_prob, &[[0, 0], [1, 1]]).unwrap();
        assert_eq!(votes.len(), 2);
        assert!((votes[0][0] - 0.3).abs() < 1e-6);
        assert!((votes[0][1] - 0.7).abs() < 1e-6);
        assert_eq!(votes[1], vec![0.9, 0.1]);
    }

    #[test]
    fn empty_object_falls_back_to_center() {
        let labels = LabelImage::zeros([4, 4]).unwrap();
        let probs: Vec<f32> = (0..4).map(|v| v as f32).collect();
        let class_prob = FieldView::new(&probs, [2, 2], 1).unwrap();
        let votes = class_votes(&labels, class_prob, &[[3, 3]]).unwrap();
        assert_eq!(votes, vec![vec![3.0]]);
    }
}
