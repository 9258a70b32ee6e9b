#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starconvex::{
    golden_spiral, instances, polar, render_labels, suppress, Candidates, FieldView,
    InstanceConfig, NmsConfig, RenderConfig, StarGeometry,
};

fn random_sparse<const D: usize>(
    seed: u64,
    count: usize,
    extent: usize,
    n_rays: usize,
) -> (Vec<[usize; D]>, Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(count);
    let mut scores = Vec::with_capacity(count);
    let mut dists = Vec::with_capacity(count * n_rays);
    for _ in 0..count {
        let mut p = [0usize; D];
        for v in p.iter_mut() {
            *v = rng.random_range(0..extent);
        }
        points.push(p);
        scores.push(rng.random::<f32>());
        for _ in 0..n_rays {
            dists.push(rng.random_range(2.0f32..6.0));
        }
    }
    (points, scores, dists)
}

fn compare<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    seed: u64,
    count: usize,
    extent: usize,
) {
    let n_rays = geometry.n_rays();
    let (points, scores, dists) = random_sparse::<D>(seed, count, extent, n_rays);
    let cands = Candidates::from_sparse(&points, &scores, &dists, n_rays).unwrap();
    let seq = NmsConfig {
        nms_thresh: 0.3,
        ..NmsConfig::default()
    };
    let par = NmsConfig {
        parallel: true,
        ..seq
    };
    let a = suppress(geometry, &cands, &seq).unwrap();
    let b = suppress(geometry, &cands, &par).unwrap();
    assert_eq!(a.indices, b.indices);
    assert_eq!(a.dists, b.dists);

    let flat: Vec<f32> = a.dists.iter().flatten().copied().collect();
    let shape = [extent + 8; D];
    let render = |parallel: bool| {
        let cfg = RenderConfig {
            overlap_label: Some(i32::MAX),
            parallel,
        };
        render_labels(geometry, shape, &a.points, &a.scores, &flat, &cfg).unwrap()
    };
    assert_eq!(render(false), render(true));
}

#[test]
fn parallel_matches_sequential_2d() {
    let rays = polar(32).unwrap();
    compare(&rays, 3, 500, 120);
}

#[test]
fn parallel_matches_sequential_3d() {
    let rays = golden_spiral(32).unwrap();
    compare(&rays, 4, 300, 30);
}

#[test]
fn parallel_pipeline_matches_sequential() {
    let shape = [48, 48];
    let mut rng = StdRng::seed_from_u64(9);
    let prob: Vec<f32> = (0..48 * 48).map(|_| rng.random::<f32>()).collect();
    let dist: Vec<f32> = (0..48 * 48 * 16)
        .map(|_| rng.random_range(2.0f32..5.0))
        .collect();
    let rays = polar(16).unwrap();
    let mut cfg = InstanceConfig::default();
    cfg.select.prob_thresh = 0.7;
    let run = |cfg: &InstanceConfig<2>| {
        instances(
            &rays,
            shape,
            FieldView::scalar(&prob, shape).unwrap(),
            FieldView::new(&dist, shape, 16).unwrap(),
            None,
            cfg,
        )
        .unwrap()
    };
    let seq = run(&cfg);
    cfg.nms.parallel = true;
    cfg.render.parallel = true;
    assert_eq!(seq, run(&cfg));
}
