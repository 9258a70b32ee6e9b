//! Uniform bucket grid over candidate centers.
//!
//! Cells are at least as wide as the largest candidate radius, so every shape
//! that can reach a query ball lies in the block of cells covering that ball.

/// Compressed bucket grid: `entries[starts[c]..starts[c + 1]]` are the points
/// in cell `c`, in ascending point order.
pub(crate) struct SpatialIndex<const D: usize> {
    origin: [f32; D],
    cell: f32,
    dims: [usize; D],
    starts: Vec<usize>,
    entries: Vec<usize>,
}

impl<const D: usize> SpatialIndex<D> {
    /// Buckets `centers` into cells no smaller than `min_cell`.
    pub(crate) fn build(centers: &[[f32; D]], min_cell: f32) -> Self {
        let mut origin = [f32::INFINITY; D];
        let mut upper = [f32::NEG_INFINITY; D];
        for c in centers {
            for axis in 0..D {
                origin[axis] = origin[axis].min(c[axis]);
                upper[axis] = upper[axis].max(c[axis]);
            }
        }
        if centers.is_empty() {
            origin = [0.0; D];
            upper = [0.0; D];
        }

        // Keep the cell count proportional to the point count.
        let budget = (4 * centers.len()).max(1) as f64;
        let mut cell = min_cell.max(1.0);
        let mut dims = [1usize; D];
        loop {
            let mut total = 1.0f64;
            for axis in 0..D {
                dims[axis] = ((upper[axis] - origin[axis]) / cell).floor() as usize + 1;
                total *= dims[axis] as f64;
            }
            if total <= budget {
                break;
            }
            cell *= 2.0;
        }

        let cell_count: usize = dims.iter().product();
        let mut counts = vec![0usize; cell_count + 1];
        let keys: Vec<usize> = centers
            .iter()
            .map(|&c| flat_cell(dims, cell_of(origin, cell, dims, c)))
            .collect();
        for &k in &keys {
            counts[k + 1] += 1;
        }
        for i in 0..cell_count {
            counts[i + 1] += counts[i];
        }
        let mut fill = counts.clone();
        let mut entries = vec![0usize; centers.len()];
        for (idx, &k) in keys.iter().enumerate() {
            entries[fill[k]] = idx;
            fill[k] += 1;
        }

        Self {
            origin,
            cell,
            dims,
            starts: counts,
            entries,
        }
    }

    /// Calls `visit` for every point whose cell touches the box around the
    /// ball `(center, radius)`.
    pub(crate) fn for_each_near<F: FnMut(usize)>(&self, center: [f32; D], radius: f32, mut visit: F) {
        let mut lo = [0usize; D];
        let mut hi = [0usize; D];
        for axis in 0..D {
            let a = ((center[axis] - radius - self.origin[axis]) / self.cell).floor();
            let b = ((center[axis] + radius - self.origin[axis]) / self.cell).floor();
            if b < 0.0 || a >= self.dims[axis] as f32 {
                return;
            }
            lo[axis] = a.max(0.0) as usize;
            hi[axis] = (b as usize).min(self.dims[axis] - 1);
        }
        let mut pos = lo;
        loop {
            let c = flat_cell(self.dims, pos);
            for &idx in &self.entries[self.starts[c]..self.starts[c + 1]] {
                visit(idx);
            }
            // Odometer increment over the cell block.
            let mut axis = D;
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                if pos[axis] < hi[axis] {
                    pos[axis] += 1;
                    break;
                }
                pos[axis] = lo[axis];
            }
        }
    }
}

fn cell_of<const D: usize>(origin: [f32; D], cell: f32, dims: [usize; D], p: [f32; D]) -> [usize; D] {
    let mut out = [0usize; D];
    for axis in 0..D {
        let k = ((p[axis] - origin[axis]) / cell).floor().max(0.0) as usize;
        out[axis] = k.min(dims[axis] - 1);
    }
    out
}

fn flat_cell<const D: usize>(dims: [usize; D], pos: [usize; D]) -> usize {
    let mut idx = 0usize;
    for axis in 0..D {
        idx = idx * dims[axis] + pos[axis];
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::SpatialIndex;

    #[test]
    fn query_returns_every_point_in_range() {
        let centers: Vec<[f32; 2]> = (0..100)
            .map(|i| [(i / 10) as f32 * 3.0, (i % 10) as f32 * 3.0])
            .collect();
        let index = SpatialIndex::build(&centers, 4.0);
        let query = [12.0, 12.0];
        let mut found = Vec::new();
        index.for_each_near(query, 5.0, |idx| found.push(idx));
        for (idx, c) in centers.iter().enumerate() {
            let d = ((c[0] - query[0]).powi(2) + (c[1] - query[1]).powi(2)).sqrt();
            if d <= 5.0 {
                assert!(found.contains(&idx), "missing {idx}");
            }
        }
        assert!(found.len() < centers.len());
    }

    #[test]
    fn query_far_outside_is_empty() {
        let centers = vec![[0.0f32, 0.0, 0.0], [1.0, 1.0, 1.0]];
        let index = SpatialIndex::build(&centers, 2.0);
        let mut count = 0;
        index.for_each_near([100.0, 100.0, 100.0], 3.0, |_| count += 1);
        assert_eq!(count, 0);
    }
}
