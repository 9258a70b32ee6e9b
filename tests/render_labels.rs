use starconvex::lowlevel::paint;
use starconvex::{
    class_votes, golden_spiral, polar, render_labels, FieldView, Polygon, RenderConfig,
    StarConvexError,
};
use std::collections::BTreeSet;

fn distinct_ids(labels: &[i32]) -> BTreeSet<i32> {
    labels.iter().copied().filter(|&v| v > 0).collect()
}

#[test]
fn ids_follow_ascending_score() {
    let rays = polar(32).unwrap();
    let points = [[10usize, 10usize], [10, 40], [40, 10], [40, 40]];
    let scores = [0.7f32, 0.2, 0.9, 0.5];
    let dists = vec![5.0f32; 4 * 32];
    let labels =
        render_labels(&rays, [50, 50], &points, &scores, &dists, &RenderConfig::default()).unwrap();

    assert_eq!(distinct_ids(labels.as_slice()), (1..=4).collect());
    assert_eq!(labels.get([10, 40]), Some(1));
    assert_eq!(labels.get([40, 40]), Some(2));
    assert_eq!(labels.get([10, 10]), Some(3));
    assert_eq!(labels.get([40, 10]), Some(4));
}

#[test]
fn disk_round_trip_2d() {
    let rays = polar(64).unwrap();
    let r = 10.0f32;
    let center = [30usize, 30usize];
    let labels = render_labels(
        &rays,
        [61, 61],
        &[center],
        &[1.0],
        &vec![r; 64],
        &RenderConfig::default(),
    )
    .unwrap();
    assert_eq!(labels.get(center), Some(1));
    for (dy, dx) in [(9i64, 0i64), (-9, 0), (0, 9), (0, -9), (6, 6), (-6, -6)] {
        let pos = [(30 + dy) as usize, (30 + dx) as usize];
        assert_eq!(labels.get(pos), Some(1), "{pos:?} should be inside");
    }
    for (dy, dx) in [(11i64, 0i64), (0, -11), (8, 8)] {
        let pos = [(30 + dy) as usize, (30 + dx) as usize];
        assert_eq!(labels.get(pos), Some(0), "{pos:?} should be outside");
    }
    let area = labels.as_slice().iter().filter(|&&v| v == 1).count() as f32;
    let disk = std::f32::consts::PI * r * r;
    assert!((area - disk).abs() < 0.05 * disk, "area {area} vs {disk}");
}

#[test]
fn ball_round_trip_3d() {
    let rays = golden_spiral(96).unwrap();
    let r = 8.0f32;
    let center = [12usize, 12usize, 12usize];
    let labels = render_labels(
        &rays,
        [25, 25, 25],
        &[center],
        &[1.0],
        &vec![r; 96],
        &RenderConfig::default(),
    )
    .unwrap();
    assert_eq!(labels.get(center), Some(1));
    for axis in 0..3 {
        let mut inside = center;
        inside[axis] += 6;
        assert_eq!(labels.get(inside), Some(1));
        inside[axis] = center[axis] - 6;
        assert_eq!(labels.get(inside), Some(1));
        let mut outside = center;
        outside[axis] += 9;
        assert_eq!(labels.get(outside), Some(0));
    }
    let volume = labels.as_slice().iter().filter(|&&v| v == 1).count() as f32;
    let ball = 4.0 / 3.0 * std::f32::consts::PI * r * r * r;
    assert!(volume > 0.85 * ball && volume < 1.05 * ball, "volume {volume} vs {ball}");
}

#[test]
fn overlap_label_in_3d() {
    let rays = golden_spiral(32).unwrap();
    let dists = vec![4.0f32; 2 * 32];
    let cfg = RenderConfig {
        overlap_label: Some(99),
        parallel: false,
    };
    let labels =
        render_labels(&rays, [12, 12, 20], &[[6, 6, 7], [6, 6, 12]], &[0.4, 0.8], &dists, &cfg)
            .unwrap();
    assert_eq!(labels.get([6, 6, 9]), Some(99));
    assert_eq!(labels.get([6, 6, 5]), Some(1));
    assert_eq!(labels.get([6, 6, 14]), Some(2));
    assert_eq!(distinct_ids(labels.as_slice()), [1, 2, 99].into_iter().collect());
}

#[test]
fn render_rejects_bad_inputs() {
    let rays = polar(8).unwrap();
    let err = render_labels(
        &rays,
        [10, 10],
        &[[1, 1]],
        &[0.5],
        &[1.0; 7],
        &RenderConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StarConvexError::ShapeMismatch { .. }));

    let err = render_labels(
        &rays,
        [10, 10],
        &[[1, 1]],
        &[0.5],
        &[1.0; 8],
        &RenderConfig {
            overlap_label: Some(1),
            parallel: false,
        },
    )
    .unwrap_err();
    assert_eq!(
        err,
        StarConvexError::OverlapLabelCollision {
            label: 1,
            objects: 1
        }
    );

    let err = render_labels(&rays, [10, 0], &[], &[], &[], &RenderConfig::default()).unwrap_err();
    assert!(matches!(err, StarConvexError::InvalidDimensions { .. }));
}

#[test]
fn paint_uses_slice_order() {
    let rays = polar(16).unwrap();
    let shapes = vec![
        Polygon::new(&rays, [5.0, 5.0], &[3.0; 16]),
        Polygon::new(&rays, [5.0, 7.0], &[3.0; 16]),
    ];
    let labels = paint([12, 12], &shapes, &RenderConfig::default()).unwrap();
    assert_eq!(labels.get([5, 3]), Some(1));
    assert_eq!(labels.get([5, 6]), Some(2));
}

#[test]
fn class_votes_average_inside_rendered_shapes() {
    let rays = polar(32).unwrap();
    let points = [[8usize, 8usize], [8, 24]];
    let dists = vec![4.0f32; 64];
    let labels = render_labels(
        &rays,
        [16, 32],
        &points,
        &[0.3, 0.6],
        &dists,
        &RenderConfig::default(),
    )
    .unwrap();

    // Two classes at half resolution: left half class 0, right half class 1.
    let mut probs = Vec::new();
    for _y in 0..8 {
        for x in 0..16 {
            if x < 8 {
                probs.extend_from_slice(&[0.9, 0.1]);
            } else {
                probs.extend_from_slice(&[0.2, 0.8]);
            }
        }
    }
    let class_prob = FieldView::new(&probs, [8, 16], 2).unwrap();
    let votes = class_votes(&labels, class_prob, &points).unwrap();
    assert_eq!(votes.len(), 2);
    assert!((votes[0][0] - 0.9).abs() < 1e-5);
    assert!((votes[1][1] - 0.8).abs() < 1e-5);
}
