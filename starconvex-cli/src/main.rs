use clap::Parser;
use serde::{Deserialize, Serialize};
use starconvex::{
    golden_spiral_anisotropic, instances, polar, Border, FieldView, InstanceConfig, Instances,
    NmsConfig, OverlapMeasure, RenderConfig, SelectConfig, StarGeometry,
};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Star-convex instance extraction (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BorderJson {
    Uniform(usize),
    PerAxis(Vec<[usize; 2]>),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SelectJson {
    prob_thresh: f32,
    grid: Option<Vec<usize>>,
    border: Option<BorderJson>,
    max_candidates: Option<usize>,
}

impl Default for SelectJson {
    fn default() -> Self {
        let cfg = SelectConfig::<2>::default();
        Self {
            prob_thresh: cfg.prob_thresh,
            grid: None,
            border: None,
            max_candidates: cfg.max_candidates,
        }
    }
}

impl SelectJson {
    fn to_config<const D: usize>(&self) -> CliResult<SelectConfig<D>> {
        let grid = match &self.grid {
            Some(grid) => to_array(grid, "select.grid")?,
            None => [1; D],
        };
        let border = match &self.border {
            None => Border::none(),
            Some(BorderJson::Uniform(width)) => Border::uniform(*width),
            Some(BorderJson::PerAxis(pairs)) => {
                let pairs: [[usize; 2]; D] = to_array(pairs, "select.border")?;
                Border {
                    margins: pairs.map(|[lo, hi]| (lo, hi)),
                }
            }
        };
        Ok(SelectConfig {
            prob_thresh: self.prob_thresh,
            grid,
            border,
            max_candidates: self.max_candidates,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MeasureConfig {
    #[default]
    Iou,
    OverSmaller,
}

impl From<&MeasureConfig> for OverlapMeasure {
    fn from(value: &MeasureConfig) -> Self {
        match value {
            MeasureConfig::Iou => OverlapMeasure::Iou,
            MeasureConfig::OverSmaller => OverlapMeasure::OverSmaller,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsJson {
    nms_thresh: f32,
    measure: MeasureConfig,
    parallel: bool,
}

impl Default for NmsJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            nms_thresh: cfg.nms_thresh,
            measure: MeasureConfig::Iou,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenderJson {
    overlap_label: Option<i32>,
    parallel: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    prediction_path: String,
    output_path: Option<String>,
    include_labels: bool,
    anisotropy: [f32; 3],
    select: SelectJson,
    nms: NmsJson,
    render: RenderJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prediction_path: String::new(),
            output_path: None,
            include_labels: true,
            anisotropy: [1.0; 3],
            select: SelectJson::default(),
            nms: NmsJson::default(),
            render: RenderJson::default(),
        }
    }
}

impl Config {
    fn instance_config<const D: usize>(&self) -> CliResult<InstanceConfig<D>> {
        Ok(InstanceConfig {
            select: self.select.to_config()?,
            nms: NmsConfig {
                nms_thresh: self.nms.nms_thresh,
                measure: (&self.nms.measure).into(),
                parallel: self.nms.parallel,
            },
            render: RenderConfig {
                overlap_label: self.render.overlap_label,
                parallel: self.render.parallel,
            },
        })
    }
}

/// Network output, flattened row-major.
#[derive(Debug, Deserialize)]
struct Prediction {
    image_shape: Vec<usize>,
    /// Spatial shape of `prob`; `ceil(image_shape / grid)` when omitted.
    prob_shape: Option<Vec<usize>>,
    n_rays: usize,
    prob: Vec<f32>,
    dist: Vec<f32>,
    n_classes: Option<usize>,
    /// Class probabilities on the `prob` grid.
    class_prob: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ObjectRecord {
    id: i32,
    point: Vec<usize>,
    prob: f32,
    dist: Vec<f32>,
    coord: Vec<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_prob: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_id: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Output {
    image_shape: Vec<usize>,
    n_objects: usize,
    objects: Vec<ObjectRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<i32>>,
}

fn to_array<T: Copy, const D: usize>(values: &[T], what: &str) -> CliResult<[T; D]> {
    <[T; D]>::try_from(values)
        .map_err(|_| format!("{what} has {} entries, expected {D}", values.len()).into())
}

fn run<G: StarGeometry<D>, const D: usize>(
    geometry: &G,
    pred: &Prediction,
    config: &Config,
) -> CliResult<Output> {
    let image_shape: [usize; D] = to_array(&pred.image_shape, "image_shape")?;
    let cfg = config.instance_config::<D>()?;
    let prob_shape: [usize; D] = match &pred.prob_shape {
        Some(shape) => to_array(shape, "prob_shape")?,
        None => {
            let mut shape = image_shape;
            for (extent, g) in shape.iter_mut().zip(cfg.select.grid) {
                *extent = extent.div_ceil(g.max(1));
            }
            shape
        }
    };

    let prob = FieldView::scalar(&pred.prob, prob_shape)?;
    let dist = FieldView::new(&pred.dist, prob_shape, pred.n_rays)?;
    let class_prob = match (&pred.class_prob, pred.n_classes) {
        (Some(data), Some(n_classes)) => Some(FieldView::new(data, prob_shape, n_classes)?),
        (Some(_), None) => return Err("class_prob requires n_classes".into()),
        _ => None,
    };

    let found = instances(geometry, image_shape, prob, dist, class_prob, &cfg)?;
    Ok(report(found, config.include_labels))
}

fn report<const D: usize>(found: Instances<D>, include_labels: bool) -> Output {
    let Instances {
        labels,
        points,
        coord,
        prob,
        dist,
        class_prob,
    } = found;
    let n_objects = points.len();
    let mut class_prob = class_prob.map(|v| v.into_iter());
    let objects = points
        .into_iter()
        .zip(coord)
        .zip(prob.into_iter().zip(dist))
        .enumerate()
        .map(|(k, ((point, coord), (prob, dist)))| {
            let votes = class_prob.as_mut().and_then(|it| it.next());
            let class_id = votes.as_ref().and_then(|v| {
                v.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(idx, _)| idx)
            });
            ObjectRecord {
                id: k as i32 + 1,
                point: point.to_vec(),
                prob,
                dist,
                coord: coord.iter().map(|v| v.to_vec()).collect(),
                class_prob: votes,
                class_id,
            }
        })
        .collect();

    Output {
        image_shape: labels.shape().to_vec(),
        n_objects,
        objects,
        labels: include_labels.then(|| labels.into_vec()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("starconvex=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.prediction_path.is_empty() {
        return Err("prediction_path must be set in the config".into());
    }
    let prediction_text = fs::read_to_string(&config.prediction_path)?;
    let prediction: Prediction = serde_json::from_str(&prediction_text)?;
    tracing::info!(
        dims = prediction.image_shape.len(),
        n_rays = prediction.n_rays,
        "loaded prediction"
    );

    let output = match prediction.image_shape.len() {
        2 => run(&polar(prediction.n_rays)?, &prediction, &config)?,
        3 => {
            let rays = golden_spiral_anisotropic(prediction.n_rays, config.anisotropy)?;
            run(&rays, &prediction, &config)?
        }
        n => return Err(format!("image_shape must have 2 or 3 axes, got {n}").into()),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
