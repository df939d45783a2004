use clap::Parser;
use serde::{Deserialize, Serialize};
use shapematch::image::io::{load_gray_image, load_pixels};
use shapematch::{
    Backend, MatchParams, MatchResult, OwnedImage, Overlay, PixelBuffer, Pose, Rect, ShapeMatcher,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Shapematch CLI (JSON config driven)")]
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

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BackendConfig {
    #[default]
    Auto,
    Portable,
    Vectorized,
}

impl BackendConfig {
    fn resolve(&self) -> Backend {
        match self {
            BackendConfig::Auto => Backend::detect(),
            BackendConfig::Portable => Backend::Portable,
            BackendConfig::Vectorized => Backend::Vectorized,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemplateConfig {
    name: String,
    path: String,
    roi: Option<Rect>,
    #[serde(default = "enabled_default")]
    enabled: bool,
}

fn enabled_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    image_path: String,
    templates: Vec<TemplateConfig>,
    region: Option<Rect>,
    backend: BackendConfig,
    output_path: Option<String>,
    params: MatchParams,
}

#[derive(Debug, Serialize)]
struct PoseRecord {
    x: f32,
    y: f32,
    angle_deg: f32,
    scale: f32,
    score: f32,
}

impl From<Pose> for PoseRecord {
    fn from(value: Pose) -> Self {
        Self {
            x: value.x,
            y: value.y,
            angle_deg: value.angle_deg,
            scale: value.scale,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct ModelRecord {
    name: String,
    pose: Option<PoseRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    success: bool,
    model: Option<String>,
    pose: PoseRecord,
    error: Option<String>,
    backend: String,
    overlay: Overlay,
    models: Vec<ModelRecord>,
}

impl Output {
    fn new(result: MatchResult, backend: Backend) -> Self {
        Self {
            success: result.success,
            model: result.model.as_ref().map(|m| m.name.clone()),
            pose: result.pose.into(),
            error: result.message(),
            backend: format!("{backend:?}"),
            overlay: result.overlay,
            models: result
                .model_scores
                .into_iter()
                .map(|s| ModelRecord {
                    name: s.name,
                    pose: s.pose.map(PoseRecord::from),
                })
                .collect(),
        }
    }
}

fn train_templates(
    matcher: &mut ShapeMatcher,
    templates: &[TemplateConfig],
) -> Result<(), Box<dyn std::error::Error>> {
    for tpl in templates {
        match tpl.roi {
            Some(roi) => {
                let source = load_gray_image(&tpl.path)?;
                let cropped = OwnedImage::from_view(source.view().roi(roi)?)?;
                let buffer = PixelBuffer::gray(cropped.data(), cropped.width(), cropped.height())?;
                matcher.train(&tpl.name, buffer, (roi.x, roi.y))?;
            }
            None => {
                let pixels = load_pixels(&tpl.path)?;
                matcher.train(&tpl.name, pixels.buffer()?, (0, 0))?;
            }
        }
        if !tpl.enabled {
            matcher.set_enabled(&tpl.name, false);
        }
        if let Some(model) = matcher.model(&tpl.name) {
            tracing::info!(
                model = tpl.name.as_str(),
                points = model.points().len(),
                "trained model"
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("shapematch=info".parse()?),
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
    if config.image_path.is_empty() || config.templates.is_empty() {
        return Err("image_path and at least one template must be set in the config".into());
    }

    let mut matcher = ShapeMatcher::new(config.params)?.with_backend(config.backend.resolve());
    train_templates(&mut matcher, &config.templates)?;

    let pixels = load_pixels(&config.image_path)?;
    let gray = pixels.buffer()?.to_gray()?;
    let result = matcher.run(
        PixelBuffer::gray(gray.data(), gray.width(), gray.height())?,
        config.region,
    );
    let output = Output::new(result, matcher.backend());
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
