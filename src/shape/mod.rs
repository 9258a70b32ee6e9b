//! Star-convex shapes built from a center, a distance vector and a ray set.
//!
//! Construction is pure: `vertex_i = center + max(dist_i, 0) * ray_i`. A zero
//! (or negative, or NaN) distance collapses its vertex onto the center and
//! yields a valid, possibly degenerate, shape.

mod polygon;
mod polyhedron;

pub use polygon::Polygon;
pub use polyhedron::Polyhedron;

/// Axis-aligned bounding box in continuous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds<const D: usize> {
    /// Inclusive lower corner.
    pub min: [f32; D],
    /// Inclusive upper corner.
    pub max: [f32; D],
}

impl<const D: usize> Bounds<D> {
    /// Bounding box of a non-empty point set seeded with `first`.
    pub(crate) fn around(first: [f32; D], points: &[[f32; D]]) -> Self {
        let mut min = first;
        let mut max = first;
        for p in points {
            for axis in 0..D {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Self { min, max }
    }

    /// Returns true if the closed boxes share at least one point.
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// Integer cell range `[lo, hi)` covered by the box, clipped to `shape`.
    ///
    /// Returns `None` when the box lies entirely outside the grid.
    pub(crate) fn cell_range(&self, shape: [usize; D]) -> Option<([usize; D], [usize; D])> {
        let mut lo = [0usize; D];
        let mut hi = [0usize; D];
        for axis in 0..D {
            let first = self.min[axis].ceil().max(0.0);
            let last = self.max[axis].floor();
            if first > last || last < 0.0 || first >= shape[axis] as f32 {
                return None;
            }
            lo[axis] = first as usize;
            hi[axis] = ((last as usize) + 1).min(shape[axis]);
        }
        Some((lo, hi))
    }
}

/// Geometry shared by polygons and polyhedra.
pub trait StarShape<const D: usize>: Send + Sync {
    /// Center the rays emanate from.
    fn center(&self) -> [f32; D];

    /// Largest vertex distance from the center; the shape fits in this ball.
    fn radius(&self) -> f32;

    /// Area (2D) or volume (3D).
    fn measure(&self) -> f32;

    /// Axis-aligned bounding box of the vertices and the center.
    fn bounds(&self) -> Bounds<D>;

    /// Absolute vertex coordinates in ray order.
    fn vertices(&self) -> &[[f32; D]];

    /// Returns true if `p` lies inside or on the boundary.
    ///
    /// The center itself is always inside.
    fn contains(&self, p: [f32; D]) -> bool;

    /// Area or volume of the intersection with `other`.
    fn intersection(&self, other: &Self) -> f32;

    /// Upper bound on the intersection of two balls with these radii at
    /// center distance `d`.
    fn ball_intersection(r1: f32, r2: f32, d: f32) -> f32;
}

/// A ray set that can turn distance vectors into shapes.
pub trait StarGeometry<const D: usize>: Send + Sync {
    /// Concrete shape type.
    type Shape: StarShape<D>;

    /// Number of rays, i.e. the expected distance-vector length.
    fn n_rays(&self) -> usize;

    /// Builds the shape at `center` from one distance per ray.
    fn shape(&self, center: [f32; D], dist: &[f32]) -> Self::Shape;

    /// Radius of the shape `dist` describes, without building it.
    fn radius(&self, dist: &[f32]) -> f32;
}

/// Clamps a predicted distance to a usable radius.
#[inline]
pub(crate) fn sanitize(d: f32) -> f32 {
    if d.is_finite() {
        d.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize, Bounds};

    #[test]
    fn bounds_intersection_is_closed() {
        let a = Bounds {
            min: [0.0, 0.0],
            max: [1.0, 1.0],
        };
        let b = Bounds {
            min: [1.0, 1.0],
            max: [2.0, 2.0],
        };
        let c = Bounds {
            min: [1.5, 0.0],
            max: [2.0, 1.0],
        };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn cell_range_clips_to_grid() {
        let b = Bounds {
            min: [-2.5, 1.2],
            max: [3.7, 40.0],
        };
        assert_eq!(b.cell_range([10, 10]), Some(([0, 2], [4, 10])));
        let outside = Bounds {
            min: [11.0, 0.0],
            max: [12.0, 1.0],
        };
        assert_eq!(outside.cell_range([10, 10]), None);
    }

    #[test]
    fn sanitize_collapses_invalid_distances() {
        assert_eq!(sanitize(-1.0), 0.0);
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(2.5), 2.5);
    }
}
