//! Exact polygon intersection area by fan decomposition.
//!
//! A star-convex polygon is the union of the triangles `(center, v_i, v_i+1)`,
//! which have disjoint interiors. The intersection of two polygons is therefore
//! the sum of pairwise intersections of convex triangles, each computed by
//! Sutherland-Hodgman clipping.

use crate::shape::{Polygon, StarShape};
use crate::util::math::cross2;

type Tri = [[f64; 2]; 3];

/// Fixed-capacity convex polygon; clipping a triangle by three half-planes
/// never exceeds six vertices.
#[derive(Clone, Copy)]
struct Ring {
    pts: [[f64; 2]; 8],
    len: usize,
}

impl Ring {
    fn from_tri(tri: &Tri) -> Self {
        let mut pts = [[0.0; 2]; 8];
        pts[..3].copy_from_slice(tri);
        Self { pts, len: 3 }
    }

    fn push(&mut self, p: [f64; 2]) {
        if self.len < self.pts.len() {
            self.pts[self.len] = p;
            self.len += 1;
        }
    }

    fn area(&self) -> f64 {
        let mut twice = 0.0;
        for i in 0..self.len {
            let a = self.pts[i];
            let b = self.pts[(i + 1) % self.len];
            twice += a[0] * b[1] - b[0] * a[1];
        }
        0.5 * twice.abs()
    }
}

fn tri_bbox(t: &Tri) -> [f64; 4] {
    let mut b = [t[0][0], t[0][1], t[0][0], t[0][1]];
    for p in &t[1..] {
        b[0] = b[0].min(p[0]);
        b[1] = b[1].min(p[1]);
        b[2] = b[2].max(p[0]);
        b[3] = b[3].max(p[1]);
    }
    b
}

fn bbox_overlap(a: &[f64; 4], b: &[f64; 4]) -> bool {
    a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
}

fn twice_signed_area(t: &Tri) -> f64 {
    cross2(
        [t[1][0] - t[0][0], t[1][1] - t[0][1]],
        [t[2][0] - t[0][0], t[2][1] - t[0][1]],
    )
}

/// Area of `subject ∩ clip` for two triangles.
fn triangle_intersection_area(subject: &Tri, clip: &Tri) -> f64 {
    let orient = twice_signed_area(clip);
    if orient.abs() < 1e-12 {
        return 0.0;
    }
    let sign = orient.signum();
    let side = |a: [f64; 2], b: [f64; 2], p: [f64; 2]| {
        sign * cross2([b[0] - a[0], b[1] - a[1]], [p[0] - a[0], p[1] - a[1]])
    };

    let mut ring = Ring::from_tri(subject);
    for e in 0..3 {
        let a = clip[e];
        let b = clip[(e + 1) % 3];
        let input = ring;
        ring.len = 0;
        for i in 0..input.len {
            let cur = input.pts[i];
            let prev = input.pts[(i + input.len - 1) % input.len];
            let s_cur = side(a, b, cur);
            let s_prev = side(a, b, prev);
            if s_cur >= 0.0 {
                if s_prev < 0.0 {
                    ring.push(crossing(prev, cur, s_prev, s_cur));
                }
                ring.push(cur);
            } else if s_prev >= 0.0 {
                ring.push(crossing(prev, cur, s_prev, s_cur));
            }
        }
        if ring.len < 3 {
            return 0.0;
        }
    }
    ring.area()
}

fn crossing(p: [f64; 2], q: [f64; 2], sp: f64, sq: f64) -> [f64; 2] {
    let t = sp / (sp - sq);
    [p[0] + t * (q[0] - p[0]), p[1] + t * (q[1] - p[1])]
}

fn fan(poly: &Polygon) -> Vec<(Tri, [f64; 4])> {
    let c = poly.center().map(f64::from);
    let n = poly.vertices().len();
    (0..n)
        .filter_map(|i| {
            let a = poly.spoke(i);
            let b = poly.spoke(i + 1);
            let tri = [c, [c[0] + a[0], c[1] + a[1]], [c[0] + b[0], c[1] + b[1]]];
            (twice_signed_area(&tri).abs() > 1e-12).then(|| (tri, tri_bbox(&tri)))
        })
        .collect()
}

/// Exact area of the intersection of two star-convex polygons.
pub(crate) fn polygon_intersection_area(a: &Polygon, b: &Polygon) -> f32 {
    if a.measure() <= 0.0 || b.measure() <= 0.0 || !a.bounds().intersects(&b.bounds()) {
        return 0.0;
    }
    let fan_a = fan(a);
    let fan_b = fan(b);
    let mut total = 0.0f64;
    for (tri_a, box_a) in &fan_a {
        for (tri_b, box_b) in &fan_b {
            if bbox_overlap(box_a, box_b) {
                total += triangle_intersection_area(tri_b, tri_a);
            }
        }
    }
    total as f32
}
