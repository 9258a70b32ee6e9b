//! Ray sets shared by every star-convex shape of a configuration.
//!
//! A ray set is a pure function of its parameters. The cached constructors
//! [`polar`] and [`golden_spiral`] build each configuration once per process
//! and hand out cheap clones of the same immutable template.

mod hull;

use crate::util::{StarConvexError, StarConvexResult};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, OnceLock};

/// Upper bound on the ray count accepted by the constructors.
pub const MAX_RAYS: usize = 1024;

/// Evenly spaced 2D ray directions, `phi_i = 2 pi i / n`.
///
/// Directions are stored in index order as `[sin(phi), cos(phi)]`, i.e. as
/// `[dy, dx]`.
#[derive(Clone, Debug)]
pub struct Rays2D {
    directions: Arc<[[f32; 2]]>,
}

impl Rays2D {
    /// Builds an uncached ray set; prefer [`polar`] for shared use.
    pub fn new(n_rays: usize) -> StarConvexResult<Self> {
        check_count(n_rays, 3, "a polygon needs at least 3 rays")?;
        let step = 2.0 * PI / n_rays as f64;
        let directions = (0..n_rays)
            .map(|i| {
                let (sin, cos) = (step * i as f64).sin_cos();
                [sin as f32, cos as f32]
            })
            .collect();
        Ok(Self { directions })
    }

    /// Returns the number of rays.
    pub fn n_rays(&self) -> usize {
        self.directions.len()
    }

    /// Returns the unit directions as `[dy, dx]`.
    pub fn directions(&self) -> &[[f32; 2]] {
        &self.directions
    }

    /// Angular spacing between consecutive rays in radians.
    pub fn step(&self) -> f32 {
        (2.0 * PI / self.n_rays() as f64) as f32
    }
}

/// Quasi-uniform 3D ray directions with a closed triangulation.
#[derive(Clone, Debug)]
pub struct Rays3D {
    inner: Arc<SphereTemplate>,
}

#[derive(Debug)]
struct SphereTemplate {
    vertices: Vec<[f32; 3]>,
    faces: Vec<[usize; 3]>,
    /// Face normal divided by the face plane offset; `None` for faces whose
    /// plane passes through the origin (their cone has no interior).
    cones: Vec<Option<[f32; 3]>>,
    anisotropy: [f32; 3],
}

impl Rays3D {
    /// Builds an uncached golden-spiral ray set; prefer [`golden_spiral`].
    ///
    /// Directions are `[z, y, x]` with `z = linspace(-1, 1, n)` and azimuth
    /// `phi_i = i (3 - sqrt 5) pi`, each axis divided by `anisotropy`.
    pub fn golden_spiral(n_rays: usize, anisotropy: [f32; 3]) -> StarConvexResult<Self> {
        check_count(n_rays, 4, "a closed polyhedron needs at least 4 rays")?;
        if anisotropy.iter().any(|&a| !a.is_finite() || a <= 0.0) {
            return Err(StarConvexError::InvalidInput(
                "anisotropy factors must be finite and positive",
            ));
        }

        let golden = (3.0 - 5.0f64.sqrt()) * PI;
        let unit: Vec<[f64; 3]> = (0..n_rays)
            .map(|i| {
                let z = -1.0 + 2.0 * i as f64 / (n_rays - 1) as f64;
                let rho = (1.0 - z * z).max(0.0).sqrt();
                let (sin, cos) = (golden * i as f64).sin_cos();
                [z, rho * sin, rho * cos]
            })
            .collect();
        // Positive axis scaling keeps the hull combinatorics, so triangulate the
        // isotropic sphere and scale afterwards.
        let faces = hull::convex_hull_faces(&unit)?;

        let vertices: Vec<[f32; 3]> = unit
            .iter()
            .map(|v| {
                [
                    (v[0] / anisotropy[0] as f64) as f32,
                    (v[1] / anisotropy[1] as f64) as f32,
                    (v[2] / anisotropy[2] as f64) as f32,
                ]
            })
            .collect();
        let cones = faces.iter().map(|&f| cone_normal(&vertices, f)).collect();

        Ok(Self {
            inner: Arc::new(SphereTemplate {
                vertices,
                faces,
                cones,
                anisotropy,
            }),
        })
    }

    /// Returns the number of rays.
    pub fn n_rays(&self) -> usize {
        self.inner.vertices.len()
    }

    /// Returns the ray directions as `[dz, dy, dx]`.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.inner.vertices
    }

    /// Returns the outward-oriented triangle faces.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.inner.faces
    }

    /// Returns the per-axis anisotropy the directions were built with.
    pub fn anisotropy(&self) -> [f32; 3] {
        self.inner.anisotropy
    }

    /// Index of the face whose cone contains direction `u`.
    ///
    /// The ray from the origin along `u` leaves the template through the face
    /// maximizing `cone . u`.
    pub(crate) fn face_of(&self, u: [f32; 3]) -> Option<usize> {
        let mut best = None;
        let mut best_score = 0.0f32;
        for (idx, cone) in self.inner.cones.iter().enumerate() {
            if let Some(m) = cone {
                let score = m[0] * u[0] + m[1] * u[1] + m[2] * u[2];
                if score > best_score {
                    best_score = score;
                    best = Some(idx);
                }
            }
        }
        best
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(&self, other: &Rays3D) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn cone_normal(vertices: &[[f32; 3]], face: [usize; 3]) -> Option<[f32; 3]> {
    let a = vertices[face[0]].map(f64::from);
    let b = vertices[face[1]].map(f64::from);
    let c = vertices[face[2]].map(f64::from);
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ];
    let offset = n[0] * a[0] + n[1] * a[1] + n[2] * a[2];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len <= 0.0 || offset <= 1e-9 * len {
        return None;
    }
    Some([
        (n[0] / offset) as f32,
        (n[1] / offset) as f32,
        (n[2] / offset) as f32,
    ])
}

fn check_count(n_rays: usize, min: usize, reason: &'static str) -> StarConvexResult<()> {
    if n_rays < min {
        return Err(StarConvexError::InvalidRays { n_rays, reason });
    }
    if n_rays > MAX_RAYS {
        return Err(StarConvexError::InvalidRays {
            n_rays,
            reason: "ray count exceeds MAX_RAYS",
        });
    }
    Ok(())
}

type Cache<K, V> = OnceLock<Mutex<HashMap<K, V>>>;

fn cached<K, V, F>(cache: &'static Cache<K, V>, key: K, build: F) -> StarConvexResult<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
    F: FnOnce() -> StarConvexResult<V>,
{
    let map = cache.get_or_init(|| Mutex::new(HashMap::new()));
    // A poisoned lock only means another builder panicked; the map stays valid.
    let mut guard = map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(value) = guard.get(&key) {
        return Ok(value.clone());
    }
    let value = build()?;
    guard.insert(key, value.clone());
    Ok(value)
}

/// Returns the shared 2D ray set for `n_rays`.
pub fn polar(n_rays: usize) -> StarConvexResult<Rays2D> {
    static CACHE: Cache<usize, Rays2D> = OnceLock::new();
    cached(&CACHE, n_rays, || Rays2D::new(n_rays))
}

/// Returns the shared isotropic golden-spiral ray set for `n_rays`.
pub fn golden_spiral(n_rays: usize) -> StarConvexResult<Rays3D> {
    golden_spiral_anisotropic(n_rays, [1.0; 3])
}

/// Returns the shared golden-spiral ray set for `n_rays` and `anisotropy`.
pub fn golden_spiral_anisotropic(n_rays: usize, anisotropy: [f32; 3]) -> StarConvexResult<Rays3D> {
    static CACHE: Cache<(usize, [u32; 3]), Rays3D> = OnceLock::new();
    let key = (n_rays, anisotropy.map(f32::to_bits));
    cached(&CACHE, key, || Rays3D::golden_spiral(n_rays, anisotropy))
}
