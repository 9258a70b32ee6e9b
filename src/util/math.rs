//! Small fixed-size vector helpers shared by the geometry code.

/// Squared Euclidean distance between two points.
#[inline]
pub(crate) fn dist_sq<const D: usize>(a: [f32; D], b: [f32; D]) -> f32 {
    let mut acc = 0.0f32;
    for axis in 0..D {
        let d = a[axis] - b[axis];
        acc += d * d;
    }
    acc
}

/// Component-wise `a - b`.
#[inline]
pub(crate) fn sub<const D: usize>(a: [f32; D], b: [f32; D]) -> [f32; D] {
    let mut out = [0.0f32; D];
    for axis in 0..D {
        out[axis] = a[axis] - b[axis];
    }
    out
}

/// Converts an integer grid position to floating point coordinates.
#[inline]
pub(crate) fn to_f32<const D: usize>(p: [usize; D]) -> [f32; D] {
    let mut out = [0.0f32; D];
    for axis in 0..D {
        out[axis] = p[axis] as f32;
    }
    out
}

/// 2D cross product in index order (`[y, x]`).
#[inline]
pub(crate) fn cross2(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

#[inline]
pub(crate) fn dot3(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Volume of a sphere segment lens formed by two balls at distance `d`.
///
/// Returns the full smaller ball when one contains the other.
pub(crate) fn ball_intersection_volume(r1: f32, r2: f32, d: f32) -> f32 {
    let (r1, r2, d) = (r1 as f64, r2 as f64, d as f64);
    if d >= r1 + r2 {
        return 0.0;
    }
    let small = r1.min(r2);
    if d <= (r1 - r2).abs() {
        return (4.0 / 3.0 * std::f64::consts::PI * small.powi(3)) as f32;
    }
    let num = std::f64::consts::PI * (r1 + r2 - d).powi(2)
        * (d * d + 2.0 * d * r2 - 3.0 * r2 * r2 + 2.0 * d * r1 + 6.0 * r1 * r2 - 3.0 * r1 * r1);
    (num / (12.0 * d)) as f32
}

/// Area of the lens formed by two disks at center distance `d`.
pub(crate) fn disk_intersection_area(r1: f32, r2: f32, d: f32) -> f32 {
    let (r1, r2, d) = (r1 as f64, r2 as f64, d as f64);
    if d >= r1 + r2 {
        return 0.0;
    }
    let small = r1.min(r2);
    if d <= (r1 - r2).abs() {
        return (std::f64::consts::PI * small * small) as f32;
    }
    let a1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0).acos();
    let a2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0).acos();
    let k = ((-d + r1 + r2) * (d + r1 - r2) * (d - r1 + r2) * (d + r1 + r2)).max(0.0);
    (r1 * r1 * a1 + r2 * r2 * a2 - 0.5 * k.sqrt()) as f32
}

#[cfg(test)]
mod tests {
    use super::{ball_intersection_volume, cross3, disk_intersection_area, dist_sq, dot3};

    #[test]
    fn dist_sq_matches_pythagoras() {
        assert!((dist_sq([0.0, 0.0], [3.0, 4.0]) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn cross3_is_orthogonal() {
        let a = [1.0, 2.0, 3.0];
        let b = [-2.0, 0.5, 1.0];
        let c = cross3(a, b);
        assert!(dot3(a, c).abs() < 1e-5);
        assert!(dot3(b, c).abs() < 1e-5);
    }

    #[test]
    fn ball_lens_handles_containment_and_separation() {
        let full = 4.0 / 3.0 * std::f32::consts::PI;
        assert!((ball_intersection_volume(1.0, 3.0, 0.5) - full).abs() < 1e-4);
        assert_eq!(ball_intersection_volume(1.0, 1.0, 2.5), 0.0);
        let half = ball_intersection_volume(1.0, 1.0, 1.0);
        assert!(half > 0.0 && half < full);
    }

    #[test]
    fn disk_lens_matches_limits() {
        let pi = std::f32::consts::PI;
        assert!((disk_intersection_area(2.0, 1.0, 0.5) - pi).abs() < 1e-4);
        assert_eq!(disk_intersection_area(1.0, 1.0, 3.0), 0.0);
        // Two unit disks one radius apart: 2pi/3 - sqrt(3)/2.
        let expected = 2.0 * pi / 3.0 - 3.0f32.sqrt() / 2.0;
        assert!((disk_intersection_area(1.0, 1.0, 1.0) - expected).abs() < 1e-4);
    }
}
