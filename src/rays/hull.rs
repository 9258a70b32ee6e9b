//! Incremental convex hull triangulation of a ray template.
//!
//! Ray directions lie on (an affine image of) the unit sphere, so every point
//! is a hull vertex and the hull faces form a closed triangulated template.

use crate::util::{StarConvexError, StarConvexResult};
use std::collections::HashSet;

const EPS: f64 = 1e-10;

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Signed distance of `p` above the plane of face `f` (outward positive).
fn height(points: &[[f64; 3]], f: [usize; 3], p: [f64; 3]) -> f64 {
    let a = points[f[0]];
    let n = cross(sub(points[f[1]], a), sub(points[f[2]], a));
    let len = norm(n);
    if len < EPS {
        return 0.0;
    }
    dot(n, sub(p, a)) / len
}

/// Picks four affinely independent points to seed the hull.
fn initial_simplex(points: &[[f64; 3]]) -> Option<[usize; 4]> {
    let i0 = 0usize;
    let i1 = (1..points.len()).max_by(|&a, &b| {
        let da = norm(sub(points[a], points[i0]));
        let db = norm(sub(points[b], points[i0]));
        da.total_cmp(&db)
    })?;
    let axis = sub(points[i1], points[i0]);
    let i2 = (0..points.len()).max_by(|&a, &b| {
        let da = norm(cross(axis, sub(points[a], points[i0])));
        let db = norm(cross(axis, sub(points[b], points[i0])));
        da.total_cmp(&db)
    })?;
    if norm(cross(axis, sub(points[i2], points[i0]))) < EPS {
        return None;
    }
    let i3 = (0..points.len()).max_by(|&a, &b| {
        let da = height(points, [i0, i1, i2], points[a]).abs();
        let db = height(points, [i0, i1, i2], points[b]).abs();
        da.total_cmp(&db)
    })?;
    if height(points, [i0, i1, i2], points[i3]).abs() < EPS {
        return None;
    }
    Some([i0, i1, i2, i3])
}

/// Triangulates the convex hull of `points` into outward-oriented faces.
///
/// Faces are index triples ordered counter-clockwise when seen from outside.
pub(crate) fn convex_hull_faces(points: &[[f64; 3]]) -> StarConvexResult<Vec<[usize; 3]>> {
    let n_rays = points.len();
    if n_rays < 4 {
        return Err(StarConvexError::InvalidRays {
            n_rays,
            reason: "at least 4 directions are needed for a closed surface",
        });
    }
    let simplex = initial_simplex(points).ok_or(StarConvexError::InvalidRays {
        n_rays,
        reason: "ray directions are coplanar",
    })?;

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(2 * n_rays);
    let mut alive: Vec<bool> = Vec::with_capacity(2 * n_rays);
    for skip in 0..4 {
        let mut tri = [0usize; 3];
        let mut k = 0;
        for (slot, &idx) in simplex.iter().enumerate() {
            if slot != skip {
                tri[k] = idx;
                k += 1;
            }
        }
        if height(points, tri, points[simplex[skip]]) > 0.0 {
            tri.swap(1, 2);
        }
        faces.push(tri);
        alive.push(true);
    }

    for p in 0..n_rays {
        if simplex.contains(&p) {
            continue;
        }
        let visible: Vec<usize> = (0..faces.len())
            .filter(|&f| alive[f] && height(points, faces[f], points[p]) > EPS)
            .collect();
        if visible.is_empty() {
            continue;
        }

        let mut edges: HashSet<(usize, usize)> = HashSet::with_capacity(visible.len() * 3);
        for &f in &visible {
            let [a, b, c] = faces[f];
            edges.insert((a, b));
            edges.insert((b, c));
            edges.insert((c, a));
        }
        let mut horizon: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|&(a, b)| !edges.contains(&(b, a)))
            .collect();
        // HashSet iteration order is unspecified.
        horizon.sort_unstable();

        for &f in &visible {
            alive[f] = false;
        }
        for (a, b) in horizon {
            faces.push([a, b, p]);
            alive.push(true);
        }
    }

    Ok(faces
        .into_iter()
        .zip(alive)
        .filter_map(|(face, keep)| keep.then_some(face))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{convex_hull_faces, cross, dot, sub};
    use crate::util::StarConvexError;

    fn octahedron() -> Vec<[f64; 3]> {
        vec![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ]
    }

    #[test]
    fn octahedron_has_eight_outward_faces() {
        let points = octahedron();
        let faces = convex_hull_faces(&points).unwrap();
        assert_eq!(faces.len(), 8);
        for f in faces {
            let a = points[f[0]];
            let n = cross(sub(points[f[1]], a), sub(points[f[2]], a));
            assert!(dot(n, a) > 0.0);
        }
    }

    #[test]
    fn too_few_points_are_rejected() {
        let err = convex_hull_faces(&octahedron()[..3]).unwrap_err();
        assert!(matches!(err, StarConvexError::InvalidRays { n_rays: 3, .. }));
    }

    #[test]
    fn coplanar_points_are_rejected() {
        let points = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
        ];
        let err = convex_hull_faces(&points).unwrap_err();
        assert!(matches!(err, StarConvexError::InvalidRays { .. }));
    }
}
