//! Star-convex polyhedra over a [`Rays3D`] set.

use crate::overlap::quadrature::polyhedron_intersection_volume;
use crate::rays::Rays3D;
use crate::shape::{sanitize, Bounds, StarGeometry, StarShape};
use crate::util::math::{ball_intersection_volume, cross3, dot3, sub};

/// Triangulated closed surface: one vertex per ray, faces from the ray set.
///
/// Each face together with the center spans a tetrahedron; the tetrahedra of
/// one polyhedron have disjoint interiors and sum to its volume.
#[derive(Clone, Debug)]
pub struct Polyhedron {
    center: [f32; 3],
    vertices: Vec<[f32; 3]>,
    /// Per face: plane normal (relative to the center) and offset.
    planes: Vec<([f32; 3], f32)>,
    radius: f32,
    volume: f32,
    bounds: Bounds<3>,
    rays: Rays3D,
}

impl Polyhedron {
    /// Builds a polyhedron; distances are matched to `rays` by index.
    pub fn new(rays: &Rays3D, center: [f32; 3], dist: &[f32]) -> Self {
        let mut radius = 0.0f32;
        let spokes: Vec<[f32; 3]> = rays
            .vertices()
            .iter()
            .zip(dist.iter().copied().chain(std::iter::repeat(0.0)))
            .map(|(dir, d)| {
                let d = sanitize(d);
                let spoke = [d * dir[0], d * dir[1], d * dir[2]];
                radius = radius.max(dot3(spoke, spoke).sqrt());
                spoke
            })
            .collect();

        let mut volume = 0.0f64;
        let planes: Vec<([f32; 3], f32)> = rays
            .faces()
            .iter()
            .map(|f| {
                let a = spokes[f[0]];
                let normal = cross3(sub(spokes[f[1]], a), sub(spokes[f[2]], a));
                let offset = dot3(normal, a).max(0.0);
                volume += offset as f64 / 6.0;
                (normal, offset)
            })
            .collect();

        let vertices: Vec<[f32; 3]> = spokes
            .iter()
            .map(|s| [center[0] + s[0], center[1] + s[1], center[2] + s[2]])
            .collect();
        let bounds = Bounds::around(center, &vertices);

        Self {
            center,
            vertices,
            planes,
            radius,
            volume: volume as f32,
            bounds,
            rays: rays.clone(),
        }
    }

    /// Triangle faces as indices into [`StarShape::vertices`].
    pub fn faces(&self) -> &[[usize; 3]] {
        self.rays.faces()
    }

    /// Volume of the tetrahedron spanned by the center and face `f`.
    #[inline]
    pub(crate) fn cone_volume(&self, f: usize) -> f32 {
        self.planes[f].1 / 6.0
    }
}

impl StarShape<3> for Polyhedron {
    fn center(&self) -> [f32; 3] {
        self.center
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn measure(&self) -> f32 {
        self.volume
    }

    fn bounds(&self) -> Bounds<3> {
        self.bounds
    }

    fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    fn contains(&self, p: [f32; 3]) -> bool {
        let u = sub(p, self.center);
        let len_sq = dot3(u, u);
        if len_sq < 1e-12 {
            return true;
        }
        if len_sq > (self.radius + 1e-3) * (self.radius + 1e-3) {
            return false;
        }
        let Some(face) = self.rays.face_of(u) else {
            return false;
        };
        let (normal, offset) = self.planes[face];
        if offset <= 1e-9 {
            return false;
        }
        dot3(normal, u) <= offset * (1.0 + 1e-5) + 1e-6
    }

    fn intersection(&self, other: &Self) -> f32 {
        polyhedron_intersection_volume(self, other)
    }

    fn ball_intersection(r1: f32, r2: f32, d: f32) -> f32 {
        ball_intersection_volume(r1, r2, d)
    }
}

impl StarGeometry<3> for Rays3D {
    type Shape = Polyhedron;

    fn n_rays(&self) -> usize {
        Rays3D::n_rays(self)
    }

    fn shape(&self, center: [f32; 3], dist: &[f32]) -> Polyhedron {
        Polyhedron::new(self, center, dist)
    }

    fn radius(&self, dist: &[f32]) -> f32 {
        self.vertices()
            .iter()
            .zip(dist)
            .fold(0.0f32, |r, (dir, &d)| {
                let d = sanitize(d);
                let spoke = [d * dir[0], d * dir[1], d * dir[2]];
                r.max(dot3(spoke, spoke).sqrt())
            })
    }
}
