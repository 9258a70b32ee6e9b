//! Radial quadrature of the intersection volume of two polyhedra.
//!
//! The smaller polyhedron is split into its center-face tetrahedra and every
//! face into `SUBDIV * SUBDIV` congruent sub-triangles. Each sub-cone is
//! integrated exactly along the ray through its centroid: the ray is cut where
//! it crosses the other polyhedron's surface, and every piece `[t0, t1]` lying
//! inside contributes `t1^3 - t0^3` of the sub-cone volume.
//!
//! Overlaps thinner than the ray spacing can slip between rays. When every
//! ray misses, a contact test on vertices and edges decides whether the
//! interiors still meet, and such pairs report a small positive volume.

use crate::shape::{Polyhedron, StarShape};
use crate::util::math::{cross3, dist_sq, dot3, sub};

const SUBDIV: usize = 3;
const SAMPLES: usize = SUBDIV * SUBDIV;

/// Volume reported for touching interiors the rays could not resolve,
/// relative to the smaller polyhedron.
const CONTACT_FRACTION: f32 = 1e-6;

/// A surface triangle with its bounding sphere.
struct Triangle {
    a: [f32; 3],
    e1: [f32; 3],
    e2: [f32; 3],
    center: [f32; 3],
    radius_sq: f32,
}

impl Triangle {
    fn new(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Self {
        let center = [
            (a[0] + b[0] + c[0]) / 3.0,
            (a[1] + b[1] + c[1]) / 3.0,
            (a[2] + b[2] + c[2]) / 3.0,
        ];
        let radius_sq = dist_sq(center, a)
            .max(dist_sq(center, b))
            .max(dist_sq(center, c));
        Self {
            a,
            e1: sub(b, a),
            e2: sub(c, a),
            center,
            radius_sq,
        }
    }

    /// Parameter `t` where `origin + t * dir` meets the closed triangle.
    fn hit(&self, origin: [f32; 3], dir: [f32; 3]) -> Option<f32> {
        const EDGE_TOL: f32 = 1e-6;
        let h = cross3(dir, self.e2);
        let det = dot3(self.e1, h);
        if det.abs() <= 1e-12 {
            return None;
        }
        let inv = 1.0 / det;
        let s = sub(origin, self.a);
        let u = inv * dot3(s, h);
        if !(-EDGE_TOL..=1.0 + EDGE_TOL).contains(&u) {
            return None;
        }
        let q = cross3(s, self.e1);
        let v = inv * dot3(dir, q);
        if v < -EDGE_TOL || u + v > 1.0 + EDGE_TOL {
            return None;
        }
        Some(inv * dot3(self.e2, q))
    }
}

fn surface(shape: &Polyhedron) -> Vec<Triangle> {
    let v = shape.vertices();
    shape
        .faces()
        .iter()
        .map(|f| Triangle::new(v[f[0]], v[f[1]], v[f[2]]))
        .collect()
}

#[inline]
fn along(origin: [f32; 3], t: f32, dir: [f32; 3]) -> [f32; 3] {
    [
        origin[0] + t * dir[0],
        origin[1] + t * dir[1],
        origin[2] + t * dir[2],
    ]
}

/// Barycentric `(s, w)` of the sub-triangle centroids of a face split
/// `SUBDIV` times per edge; point = `p0 + s (p1 - p0) + w (p2 - p0)`.
fn sub_centroids() -> [[f32; 2]; SAMPLES] {
    let n = SUBDIV as f32;
    let mut out = [[0.0; 2]; SAMPLES];
    let mut k = 0;
    for i in 0..SUBDIV {
        for j in 0..SUBDIV - i {
            out[k] = [(i as f32 + 1.0 / 3.0) / n, (j as f32 + 1.0 / 3.0) / n];
            k += 1;
            if i + j + 1 < SUBDIV {
                out[k] = [(i as f32 + 2.0 / 3.0) / n, (j as f32 + 2.0 / 3.0) / n];
                k += 1;
            }
        }
    }
    out
}

/// Estimated volume of `a ∩ b`.
pub(crate) fn polyhedron_intersection_volume(a: &Polyhedron, b: &Polyhedron) -> f32 {
    if a.measure() <= 0.0 || b.measure() <= 0.0 || !a.bounds().intersects(&b.bounds()) {
        return 0.0;
    }
    let (sampled, host) = if b.measure() <= a.measure() {
        (b, a)
    } else {
        (a, b)
    };

    let host_surface = surface(host);
    let center = sampled.center();
    let start_inside = host.contains(center);
    let samples = sub_centroids();
    let vertices = sampled.vertices();

    let mut near: Vec<&Triangle> = Vec::new();
    let mut hits: Vec<f32> = Vec::new();
    let mut inside = 0.0f64;
    for (f, face) in sampled.faces().iter().enumerate() {
        let volume = sampled.cone_volume(f);
        if volume <= 0.0 {
            continue;
        }
        let [p0, p1, p2] = (*face).map(|v| sub(vertices[v], center));

        // Bounding sphere of the tetrahedron (center, p0, p1, p2).
        let mid = [
            (p0[0] + p1[0] + p2[0]) / 4.0,
            (p0[1] + p1[1] + p2[1]) / 4.0,
            (p0[2] + p1[2] + p2[2]) / 4.0,
        ];
        let reach = [[0.0; 3], p0, p1, p2]
            .iter()
            .map(|&p| dist_sq(p, mid))
            .fold(0.0f32, f32::max)
            .sqrt();
        let mid = along(center, 1.0, mid);
        near.clear();
        near.extend(host_surface.iter().filter(|t| {
            let r = reach + t.radius_sq.sqrt();
            dist_sq(t.center, mid) <= r * r
        }));
        if near.is_empty() {
            if start_inside {
                inside += volume as f64;
            }
            continue;
        }

        let e1 = sub(p1, p0);
        let e2 = sub(p2, p0);
        let mut share = 0.0f32;
        for &[s, w] in &samples {
            let dir = along(along(p0, s, e1), w, e2);
            hits.clear();
            hits.extend(
                near.iter()
                    .filter_map(|t| t.hit(center, dir))
                    .filter(|&t| t > 0.0 && t < 1.0),
            );
            share += radial_share(host, center, dir, &mut hits, start_inside);
        }
        inside += (volume * share / SAMPLES as f32) as f64;
    }

    let inside = (inside as f32).min(sampled.measure());
    if inside <= 0.0 && interiors_meet(sampled, host, &host_surface) {
        return CONTACT_FRACTION * sampled.measure();
    }
    inside
}

/// Volume share of the cone along `origin + t * dir`, `t` in `[0, 1]`, that
/// lies inside `host`. `hits` holds the surface crossings in `(0, 1)`.
fn radial_share(
    host: &Polyhedron,
    origin: [f32; 3],
    dir: [f32; 3],
    hits: &mut Vec<f32>,
    start_inside: bool,
) -> f32 {
    if hits.is_empty() {
        return if start_inside { 1.0 } else { 0.0 };
    }
    hits.sort_by(f32::total_cmp);
    hits.push(1.0);
    let mut share = 0.0f32;
    let mut lo = 0.0f32;
    for (k, &hi) in hits.iter().enumerate() {
        if hi - lo > 1e-6 {
            let covered = if k == 0 {
                start_inside
            } else {
                host.contains(along(origin, 0.5 * (lo + hi), dir))
            };
            if covered {
                share += hi * hi * hi - lo * lo * lo;
            }
        }
        lo = hi;
    }
    share
}

/// Returns true if a vertex of one shape lies inside the other or an edge of
/// one crosses the surface of the other.
fn interiors_meet(a: &Polyhedron, b: &Polyhedron, b_surface: &[Triangle]) -> bool {
    if a.vertices().iter().any(|&v| b.contains(v))
        || b.vertices().iter().any(|&v| a.contains(v))
    {
        return true;
    }
    edges_cross(a, b, b_surface) || edges_cross(b, a, &surface(a))
}

fn edges_cross(from: &Polyhedron, to: &Polyhedron, to_surface: &[Triangle]) -> bool {
    let bounds = to.bounds();
    let v = from.vertices();
    from.faces().iter().any(|face| {
        (0..3).any(|k| {
            let (p, q) = (v[face[k]], v[face[(k + 1) % 3]]);
            let reaches = (0..3).all(|axis| {
                p[axis].min(q[axis]) <= bounds.max[axis]
                    && p[axis].max(q[axis]) >= bounds.min[axis]
            });
            let dir = sub(q, p);
            reaches
                && to_surface
                    .iter()
                    .any(|t| t.hit(p, dir).is_some_and(|s| s > 0.0 && s < 1.0))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::{polyhedron_intersection_volume, sub_centroids, SAMPLES};
    use crate::rays::golden_spiral;
    use crate::shape::{Polyhedron, StarShape};

    /// Intersection volume counted on a regular lattice.
    fn lattice_intersection(a: &Polyhedron, b: &Polyhedron, step: f32) -> f32 {
        let (lo, hi) = (a.bounds().min, a.bounds().max);
        let count = |axis: usize| ((hi[axis] - lo[axis]) / step).ceil() as usize + 1;
        let mut hits = 0usize;
        for i in 0..count(0) {
            for j in 0..count(1) {
                for k in 0..count(2) {
                    let p = [
                        lo[0] + i as f32 * step,
                        lo[1] + j as f32 * step,
                        lo[2] + k as f32 * step,
                    ];
                    if a.contains(p) && b.contains(p) {
                        hits += 1;
                    }
                }
            }
        }
        hits as f32 * step * step * step
    }

    fn iou(inter: f32, a: &Polyhedron, b: &Polyhedron) -> f32 {
        inter / (a.measure() + b.measure() - inter)
    }

    #[test]
    fn sub_centroids_lie_inside_the_face() {
        let samples = sub_centroids();
        assert_eq!(samples.len(), SAMPLES);
        for [s, w] in samples {
            assert!(s > 0.0 && w > 0.0 && s + w < 1.0);
        }
        let mean_s: f32 = samples.iter().map(|p| p[0]).sum::<f32>() / SAMPLES as f32;
        assert!((mean_s - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn identical_polyhedra_overlap_fully() {
        let rays = golden_spiral(32).unwrap();
        let dist: Vec<f32> = (0..32).map(|i| 6.0 + (i % 4) as f32 * 0.5).collect();
        let a = Polyhedron::new(&rays, [10.0, 10.0, 10.0], &dist);
        let inter = polyhedron_intersection_volume(&a, &a);
        assert!((inter - a.measure()).abs() < 1e-3 * a.measure());
    }

    #[test]
    fn distant_polyhedra_do_not_overlap() {
        let rays = golden_spiral(32).unwrap();
        let a = Polyhedron::new(&rays, [0.0; 3], &[5.0; 32]);
        let b = Polyhedron::new(&rays, [0.0, 0.0, 11.0], &[5.0; 32]);
        assert_eq!(polyhedron_intersection_volume(&a, &b), 0.0);
    }

    #[test]
    fn nested_polyhedron_is_fully_counted() {
        let rays = golden_spiral(32).unwrap();
        let big = Polyhedron::new(&rays, [0.0; 3], &[10.0; 32]);
        let small = Polyhedron::new(&rays, [1.0, 0.0, 0.0], &[3.0; 32]);
        let inter = polyhedron_intersection_volume(&big, &small);
        assert!((inter - small.measure()).abs() < 1e-3 * small.measure());
    }

    #[test]
    fn shifted_pairs_match_lattice_count() {
        let rays = golden_spiral(32).unwrap();
        let a = Polyhedron::new(&rays, [20.0; 3], &[10.0; 32]);
        for shift in [1.0f32, 4.0, 8.0, 12.0, 16.0] {
            let b = Polyhedron::new(&rays, [20.0, 20.0, 20.0 + shift], &[10.0; 32]);
            let expected = iou(lattice_intersection(&a, &b, 0.4), &a, &b);
            let estimate = iou(polyhedron_intersection_volume(&a, &b), &a, &b);
            assert!(
                (estimate - expected).abs() < 0.03,
                "shift {shift}: estimate {estimate} lattice {expected}"
            );
        }
    }

    #[test]
    fn one_voxel_offset_is_not_a_full_overlap() {
        let rays = golden_spiral(32).unwrap();
        let a = Polyhedron::new(&rays, [20.0; 3], &[10.0; 32]);
        let b = Polyhedron::new(&rays, [21.0, 20.0, 20.0], &[10.0; 32]);
        let value = iou(polyhedron_intersection_volume(&a, &b), &a, &b);
        assert!(value > 0.8 && value < 0.9, "iou {value}");
    }

    #[test]
    fn grazing_pair_overlaps_by_a_positive_amount() {
        let rays = golden_spiral(32).unwrap();
        // The pole vertices sit on axis 0; each pole pokes into the other shape.
        let a = Polyhedron::new(&rays, [20.0; 3], &[10.0; 32]);
        let b = Polyhedron::new(&rays, [38.0, 20.0, 20.0], &[10.0; 32]);
        assert!(b.contains(a.vertices()[31]));
        assert!(polyhedron_intersection_volume(&a, &b) > 0.0);
        assert!(polyhedron_intersection_volume(&b, &a) > 0.0);
    }
}
