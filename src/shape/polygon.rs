//! Star-convex polygons over a [`Rays2D`] set.

use crate::overlap::clip::polygon_intersection_area;
use crate::rays::Rays2D;
use crate::shape::{sanitize, Bounds, StarGeometry, StarShape};
use crate::util::math::cross2;

/// Closed polygon with one vertex per ray, in ray order.
#[derive(Clone, Debug)]
pub struct Polygon {
    center: [f32; 2],
    vertices: Vec<[f32; 2]>,
    radius: f32,
    area: f32,
    bounds: Bounds<2>,
    step: f32,
}

impl Polygon {
    /// Builds a polygon; distances are matched to `rays` by index.
    pub fn new(rays: &Rays2D, center: [f32; 2], dist: &[f32]) -> Self {
        let mut radius = 0.0f32;
        let vertices: Vec<[f32; 2]> = rays
            .directions()
            .iter()
            .zip(dist.iter().copied().chain(std::iter::repeat(0.0)))
            .map(|(dir, d)| {
                let d = sanitize(d);
                radius = radius.max(d);
                [center[0] + d * dir[0], center[1] + d * dir[1]]
            })
            .collect();

        let mut twice_area = 0.0f64;
        for i in 0..vertices.len() {
            let a = vertices[i];
            let b = vertices[(i + 1) % vertices.len()];
            twice_area += a[0] as f64 * b[1] as f64 - b[0] as f64 * a[1] as f64;
        }
        let bounds = Bounds::around(center, &vertices);

        Self {
            center,
            vertices,
            radius,
            area: (0.5 * twice_area.abs()) as f32,
            bounds,
            step: rays.step(),
        }
    }

    /// Vertex `i` relative to the center, wrapping around.
    #[inline]
    pub(crate) fn spoke(&self, i: usize) -> [f64; 2] {
        let v = self.vertices[i % self.vertices.len()];
        [
            (v[0] - self.center[0]) as f64,
            (v[1] - self.center[1]) as f64,
        ]
    }
}

impl StarShape<2> for Polygon {
    fn center(&self) -> [f32; 2] {
        self.center
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn measure(&self) -> f32 {
        self.area
    }

    fn bounds(&self) -> Bounds<2> {
        self.bounds
    }

    fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    fn contains(&self, p: [f32; 2]) -> bool {
        let u = [
            (p[0] - self.center[0]) as f64,
            (p[1] - self.center[1]) as f64,
        ];
        let len_sq = u[0] * u[0] + u[1] * u[1];
        if len_sq < 1e-12 {
            return true;
        }
        if len_sq > (self.radius as f64 + 1e-3).powi(2) {
            return false;
        }

        let n = self.vertices.len();
        let mut angle = u[0].atan2(u[1]);
        if angle < 0.0 {
            angle += std::f64::consts::TAU;
        }
        let sector = ((angle / self.step as f64) as usize).min(n - 1);
        let a = self.spoke(sector);
        let b = self.spoke(sector + 1);
        let edge = [b[0] - a[0], b[1] - a[1]];
        let origin_side = cross2(edge, [-a[0], -a[1]]);
        if origin_side.abs() < 1e-9 {
            return false;
        }
        let point_side = cross2(edge, [u[0] - a[0], u[1] - a[1]]);
        let tolerance = 1e-4 * (edge[0].hypot(edge[1]) + 1.0);
        point_side * origin_side.signum() >= -tolerance
    }

    fn intersection(&self, other: &Self) -> f32 {
        polygon_intersection_area(self, other)
    }

    fn ball_intersection(r1: f32, r2: f32, d: f32) -> f32 {
        crate::util::math::disk_intersection_area(r1, r2, d)
    }
}

impl StarGeometry<2> for Rays2D {
    type Shape = Polygon;

    fn n_rays(&self) -> usize {
        Rays2D::n_rays(self)
    }

    fn shape(&self, center: [f32; 2], dist: &[f32]) -> Polygon {
        Polygon::new(self, center, dist)
    }

    fn radius(&self, dist: &[f32]) -> f32 {
        dist.iter()
            .take(self.n_rays())
            .fold(0.0f32, |r, &d| r.max(sanitize(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::Polygon;
    use crate::rays::polar;
    use crate::shape::{StarGeometry, StarShape};

    #[test]
    fn radius_is_known_before_building() {
        let rays = polar(8).unwrap();
        let dist = [1.0, 3.0, f32::NAN, -2.0, 2.5, 0.0, 1.5, 2.0];
        assert_eq!(rays.radius(&dist), rays.shape([0.0, 0.0], &dist).radius());
        assert_eq!(rays.radius(&dist), 3.0);
    }

    #[test]
    fn square_polygon_has_expected_area() {
        let rays = polar(4).unwrap();
        let poly = Polygon::new(&rays, [10.0, 10.0], &[2.0; 4]);
        // Diamond with half-diagonals of 2.
        assert!((poly.measure() - 8.0).abs() < 1e-4);
        assert!((poly.radius() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn contains_center_even_when_degenerate() {
        let rays = polar(8).unwrap();
        let poly = Polygon::new(&rays, [3.0, 4.0], &[0.0; 8]);
        assert_eq!(poly.measure(), 0.0);
        assert!(poly.contains([3.0, 4.0]));
        assert!(!poly.contains([3.0, 5.0]));
    }

    #[test]
    fn contains_respects_the_boundary() {
        let rays = polar(32).unwrap();
        let poly = Polygon::new(&rays, [0.0, 0.0], &[5.0; 32]);
        assert!(poly.contains([0.0, 5.0]));
        assert!(poly.contains([-4.8, 0.0]));
        assert!(!poly.contains([0.0, 5.5]));
        assert!(!poly.contains([3.7, 3.7]));
        assert!(poly.contains([3.4, 3.4]));
    }
}
