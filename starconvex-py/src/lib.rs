//! Python bindings for the starconvex library.
//!
//! Arrays follow numpy index order: `(y, x)` or `(z, y, x)` spatial axes with
//! rays or classes on the last axis.

use numpy::{
    PyArray1, PyArray2, PyArrayDyn, PyArrayMethods, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArrayDyn, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use starconvex::{
    golden_spiral_anisotropic, polar, Border, Candidates, FieldView,
    InstanceConfig as RustInstanceConfig, LabelImage, NmsConfig, OverlapMeasure, RenderConfig,
    SelectConfig, StarConvexError, StarGeometry,
};

/// Convert a StarConvexError to a Python exception.
fn to_py_err(err: StarConvexError) -> PyErr {
    match err {
        StarConvexError::NotSupported(_) => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn parse_measure(measure: &str) -> PyResult<OverlapMeasure> {
    match measure.to_lowercase().as_str() {
        "iou" => Ok(OverlapMeasure::Iou),
        "over_smaller" => Ok(OverlapMeasure::OverSmaller),
        _ => Err(PyValueError::new_err(
            "measure must be 'iou' or 'over_smaller'",
        )),
    }
}

fn to_array<T: Copy, const D: usize>(values: &[T], what: &str) -> PyResult<[T; D]> {
    <[T; D]>::try_from(values).map_err(|_| {
        PyValueError::new_err(format!(
            "{what} has {} entries, expected {D}",
            values.len()
        ))
    })
}

/// Dimension-independent settings for instance extraction.
#[pyclass]
#[derive(Clone)]
pub struct InstanceConfig {
    prob_thresh: f32,
    nms_thresh: f32,
    grid: Option<Vec<usize>>,
    border: usize,
    max_candidates: Option<usize>,
    measure: OverlapMeasure,
    overlap_label: Option<i32>,
    parallel: bool,
}

#[pymethods]
impl InstanceConfig {
    /// Create a new InstanceConfig.
    ///
    /// Args:
    ///     prob_thresh: Candidates need probability above this (default: 0.5)
    ///     nms_thresh: Overlap above this suppresses (default: 0.4)
    ///     grid: Subsampling factor per axis (default: ones)
    ///     border: Margin excluded on every side, in grid cells (default: 0)
    ///     max_candidates: Fail when more candidates are selected (default: None)
    ///     measure: "iou" or "over_smaller" (default: "iou")
    ///     overlap_label: Label for contested pixels (default: None)
    ///     parallel: Use the thread pool (default: False)
    #[new]
    #[pyo3(signature = (
        prob_thresh = 0.5,
        nms_thresh = 0.4,
        grid = None,
        border = 0,
        max_candidates = None,
        measure = "iou",
        overlap_label = None,
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        prob_thresh: f32,
        nms_thresh: f32,
        grid: Option<Vec<usize>>,
        border: usize,
        max_candidates: Option<usize>,
        measure: &str,
        overlap_label: Option<i32>,
        parallel: bool,
    ) -> PyResult<Self> {
        let cfg = Self {
            prob_thresh,
            nms_thresh,
            grid,
            border,
            max_candidates,
            measure: parse_measure(measure)?,
            overlap_label,
            parallel,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        let dims = self.grid.as_ref().map_or(2, Vec::len);
        match dims {
            2 => self.resolve::<2>().map(|_| ()),
            3 => self.resolve::<3>().map(|_| ()),
            _ => Err(PyValueError::new_err("grid must have 2 or 3 entries")),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "InstanceConfig(prob_thresh={}, nms_thresh={}, grid={:?}, border={}, overlap_label={:?}, parallel={})",
            self.prob_thresh,
            self.nms_thresh,
            self.grid,
            self.border,
            self.overlap_label,
            self.parallel
        )
    }
}

impl InstanceConfig {
    fn resolve<const D: usize>(&self) -> PyResult<RustInstanceConfig<D>> {
        let grid = match &self.grid {
            Some(grid) => to_array(grid, "grid")?,
            None => [1; D],
        };
        let cfg = RustInstanceConfig {
            select: SelectConfig {
                prob_thresh: self.prob_thresh,
                grid,
                border: Border::uniform(self.border),
                max_candidates: self.max_candidates,
            },
            nms: NmsConfig {
                nms_thresh: self.nms_thresh,
                measure: self.measure,
                parallel: self.parallel,
            },
            render: RenderConfig {
                overlap_label: self.overlap_label,
                parallel: self.parallel,
            },
        };
        cfg.validate().map_err(to_py_err)?;
        Ok(cfg)
    }

    fn default_config() -> Self {
        Self {
            prob_thresh: 0.5,
            nms_thresh: 0.4,
            grid: None,
            border: 0,
            max_candidates: None,
            measure: OverlapMeasure::Iou,
            overlap_label: None,
            parallel: false,
        }
    }
}

fn labels_to_py<'py, const D: usize>(
    py: Python<'py>,
    labels: LabelImage<D>,
) -> PyResult<Bound<'py, PyArrayDyn<i32>>> {
    let shape = labels.shape().to_vec();
    PyArray1::from_vec(py, labels.into_vec()).reshape(shape)
}

fn rows_to_py<'py, T: numpy::Element + Copy>(
    py: Python<'py>,
    rows: &[Vec<T>],
    width: usize,
) -> PyResult<Bound<'py, PyArray2<T>>> {
    let flat: Vec<T> = rows.iter().flatten().copied().collect();
    PyArray1::from_vec(py, flat).reshape([rows.len(), width])
}

#[allow(clippy::too_many_arguments)]
fn run_instances<'py, G: StarGeometry<D>, const D: usize>(
    py: Python<'py>,
    geometry: &G,
    img_shape: &[usize],
    prob: &[f32],
    prob_shape: &[usize],
    dist: &[f32],
    class_prob: Option<(&[f32], &[usize])>,
    config: &InstanceConfig,
) -> PyResult<(Bound<'py, PyArrayDyn<i32>>, Bound<'py, PyDict>)> {
    let img_shape: [usize; D] = to_array(img_shape, "img_shape")?;
    let spatial: [usize; D] = to_array(&prob_shape[..D], "prob shape")?;
    let cfg = config.resolve::<D>()?;
    let prob = FieldView::scalar(prob, spatial).map_err(to_py_err)?;
    let dist = FieldView::new(dist, spatial, geometry.n_rays()).map_err(to_py_err)?;
    let class_view = match class_prob {
        Some((data, shape)) => {
            let class_spatial: [usize; D] = to_array(&shape[..D], "prob_class shape")?;
            Some(FieldView::new(data, class_spatial, shape[D]).map_err(to_py_err)?)
        }
        None => None,
    };

    let found = starconvex::instances(geometry, img_shape, prob, dist, class_view, &cfg)
        .map_err(to_py_err)?;
    let n_rays = geometry.n_rays();
    let dict = PyDict::new(py);
    let points: Vec<Vec<usize>> = found.points.iter().map(|p| p.to_vec()).collect();
    dict.set_item("points", rows_to_py(py, &points, D)?)?;
    dict.set_item("prob", PyArray1::from_slice(py, &found.prob))?;
    dict.set_item("dist", rows_to_py(py, &found.dist, n_rays)?)?;
    let coord: Vec<f32> = found.coord.iter().flatten().flatten().copied().collect();
    dict.set_item(
        "coord",
        PyArray1::from_vec(py, coord).reshape([found.coord.len(), n_rays, D])?,
    )?;
    if let Some(votes) = &found.class_prob {
        let n_classes = class_prob.map_or(0, |(_, shape)| shape[D]);
        dict.set_item("class_prob", rows_to_py(py, votes, n_classes)?)?;
    }
    Ok((labels_to_py(py, found.labels)?, dict))
}

/// Convert dense network output into a label image and per-object metadata.
///
/// Args:
///     img_shape: Full-resolution image shape, 2 or 3 entries
///     prob: float32 array with the prediction grid shape
///     dist: float32 array, prediction grid shape plus a ray axis
///     prob_class: optional float32 array with a trailing class axis
///     config: InstanceConfig (default: InstanceConfig())
///     anisotropy: per-axis ray scaling for 3D (default: (1, 1, 1))
///
/// Returns:
///     (labels, dict) with "points", "prob", "dist", "coord" and optionally
///     "class_prob", all ordered by label id
#[pyfunction]
#[pyo3(signature = (img_shape, prob, dist, prob_class = None, config = None, anisotropy = None))]
fn instances_from_prediction<'py>(
    py: Python<'py>,
    img_shape: Vec<usize>,
    prob: PyReadonlyArrayDyn<'py, f32>,
    dist: PyReadonlyArrayDyn<'py, f32>,
    prob_class: Option<PyReadonlyArrayDyn<'py, f32>>,
    config: Option<InstanceConfig>,
    anisotropy: Option<[f32; 3]>,
) -> PyResult<(Bound<'py, PyArrayDyn<i32>>, Bound<'py, PyDict>)> {
    let config = config.unwrap_or_else(InstanceConfig::default_config);
    let dims = img_shape.len();
    let dist_shape = dist.shape().to_vec();
    if prob.ndim() != dims || dist_shape.len() != dims + 1 {
        return Err(PyValueError::new_err(
            "prob needs one axis per image axis and dist one more for rays",
        ));
    }
    if prob.shape() != &dist_shape[..dims] {
        return Err(PyValueError::new_err(
            "prob and dist must share their spatial shape",
        ));
    }
    let n_rays = dist_shape[dims];
    let class_shape = prob_class.as_ref().map(|c| c.shape().to_vec());
    if class_shape.as_ref().is_some_and(|s| s.len() != dims + 1) {
        return Err(PyValueError::new_err(
            "prob_class needs one axis per image axis plus a class axis",
        ));
    }
    let class_data = match &prob_class {
        Some(c) => Some(c.as_slice()?),
        None => None,
    };
    let class_prob = class_data.zip(class_shape.as_deref());

    let prob_data = prob.as_slice()?;
    let dist_data = dist.as_slice()?;
    match dims {
        2 => {
            let rays = polar(n_rays).map_err(to_py_err)?;
            run_instances::<_, 2>(
                py, &rays, &img_shape, prob_data, &dist_shape, dist_data, class_prob, &config,
            )
        }
        3 => {
            let rays = golden_spiral_anisotropic(n_rays, anisotropy.unwrap_or([1.0; 3]))
                .map_err(to_py_err)?;
            run_instances::<_, 3>(
                py, &rays, &img_shape, prob_data, &dist_shape, dist_data, class_prob, &config,
            )
        }
        _ => Err(PyValueError::new_err("img_shape must have 2 or 3 entries")),
    }
}

fn points_from_py<const D: usize>(points: &[i64], count: usize) -> PyResult<Vec<[usize; D]>> {
    let mut out = Vec::with_capacity(count);
    for row in points.chunks_exact(D) {
        let mut p = [0usize; D];
        for (dst, &src) in p.iter_mut().zip(row) {
            *dst = usize::try_from(src)
                .map_err(|_| PyValueError::new_err("points must be non-negative"))?;
        }
        out.push(p);
    }
    Ok(out)
}

fn sparse_nms<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    points: &[i64],
    scores: &[f32],
    dist: &[f32],
    config: &NmsConfig,
) -> PyResult<Vec<usize>> {
    let points = points_from_py::<D>(points, scores.len())?;
    let cands =
        Candidates::from_sparse(&points, scores, dist, geometry.n_rays()).map_err(to_py_err)?;
    let kept = starconvex::suppress(geometry, &cands, config).map_err(to_py_err)?;
    Ok(kept.indices)
}

/// Greedy NMS on sparse candidates.
///
/// Args:
///     points: int64 array (n, 2) or (n, 3) of centers
///     scores: float32 array (n,)
///     dist: float32 array (n, n_rays)
///     nms_thresh: Overlap above this suppresses (default: 0.4)
///     measure: "iou" or "over_smaller" (default: "iou")
///     anisotropy: per-axis ray scaling for 3D (default: (1, 1, 1))
///
/// Returns:
///     Indices of survivors in ascending score order
#[pyfunction]
#[pyo3(signature = (points, scores, dist, nms_thresh = 0.4, measure = "iou", anisotropy = None))]
fn non_maximum_suppression_sparse<'py>(
    py: Python<'py>,
    points: PyReadonlyArray2<'py, i64>,
    scores: PyReadonlyArray1<'py, f32>,
    dist: PyReadonlyArray2<'py, f32>,
    nms_thresh: f32,
    measure: &str,
    anisotropy: Option<[f32; 3]>,
) -> PyResult<Bound<'py, PyArray1<usize>>> {
    let config = NmsConfig {
        nms_thresh,
        measure: parse_measure(measure)?,
        parallel: false,
    };
    let dims = points.shape()[1];
    let n_rays = dist.shape()[1];
    let (p, s, d) = (points.as_slice()?, scores.as_slice()?, dist.as_slice()?);
    let kept = match dims {
        2 => sparse_nms::<_, 2>(&polar(n_rays).map_err(to_py_err)?, p, s, d, &config)?,
        3 => {
            let rays = golden_spiral_anisotropic(n_rays, anisotropy.unwrap_or([1.0; 3]))
                .map_err(to_py_err)?;
            sparse_nms::<_, 3>(&rays, p, s, d, &config)?
        }
        _ => return Err(PyValueError::new_err("points must have 2 or 3 columns")),
    };
    Ok(PyArray1::from_vec(py, kept))
}

fn sparse_render<'py, G: StarGeometry<D>, const D: usize>(
    py: Python<'py>,
    geometry: &G,
    shape: &[usize],
    points: &[i64],
    scores: &[f32],
    dist: &[f32],
    config: &RenderConfig,
) -> PyResult<Bound<'py, PyArrayDyn<i32>>> {
    let shape: [usize; D] = to_array(shape, "shape")?;
    let points = points_from_py::<D>(points, scores.len())?;
    let labels = starconvex::render_labels(geometry, shape, &points, scores, dist, config)
        .map_err(to_py_err)?;
    labels_to_py(py, labels)
}

/// Paint shapes into a label image, lowest score first.
///
/// Args:
///     points: int64 array (n, 2) or (n, 3) of centers
///     scores: float32 array (n,)
///     dist: float32 array (n, n_rays)
///     shape: output shape
///     overlap_label: label for contested pixels (default: None)
///     anisotropy: per-axis ray scaling for 3D (default: (1, 1, 1))
#[pyfunction]
#[pyo3(signature = (points, scores, dist, shape, overlap_label = None, anisotropy = None))]
fn render_labels<'py>(
    py: Python<'py>,
    points: PyReadonlyArray2<'py, i64>,
    scores: PyReadonlyArray1<'py, f32>,
    dist: PyReadonlyArray2<'py, f32>,
    shape: Vec<usize>,
    overlap_label: Option<i32>,
    anisotropy: Option<[f32; 3]>,
) -> PyResult<Bound<'py, PyArrayDyn<i32>>> {
    let config = RenderConfig {
        overlap_label,
        parallel: false,
    };
    let n_rays = dist.shape()[1];
    let (p, s, d) = (points.as_slice()?, scores.as_slice()?, dist.as_slice()?);
    match (points.shape()[1], shape.len()) {
        (2, 2) => {
            let rays = polar(n_rays).map_err(to_py_err)?;
            sparse_render::<_, 2>(py, &rays, &shape, p, s, d, &config)
        }
        (3, 3) => {
            let rays = golden_spiral_anisotropic(n_rays, anisotropy.unwrap_or([1.0; 3]))
                .map_err(to_py_err)?;
            sparse_render::<_, 3>(py, &rays, &shape, p, s, d, &config)
        }
        _ => Err(PyValueError::new_err(
            "points columns and shape must both be 2 or 3",
        )),
    }
}

/// Python module for star-convex instance extraction.
#[pymodule]
fn _starconvex(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<InstanceConfig>()?;
    m.add_function(wrap_pyfunction!(instances_from_prediction, m)?)?;
    m.add_function(wrap_pyfunction!(non_maximum_suppression_sparse, m)?)?;
    m.add_function(wrap_pyfunction!(render_labels, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
