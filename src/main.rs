use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{ArgGroup, Parser};
use image::DynamicImage;
use photomark::config::EngineConfig;
use photomark::watermark::{
    DateFormat, ImageWatermarkStyle, OutputFormat, PixelBBox, PositionSpec, ScaleMode, TextStyle,
    TimestampStyle, WatermarkEngine, WatermarkPosition, WatermarkSpec,
};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-image line printed with `--report`.
#[derive(Debug, Serialize)]
struct Report {
    input: PathBuf,
    output: PathBuf,
    bbox: Option<PixelBBox>,
}

/// Photomark - overlay text, timestamp or logo watermarks onto photos
#[derive(Parser, Debug)]
#[command(name = "photomark")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("watermark").required(true).args(["text", "image", "timestamp"])))]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Text watermark ("\n" starts a new line)
    #[arg(long)]
    text: Option<String>,

    /// Image watermark file
    #[arg(long)]
    image: Option<PathBuf>,

    /// Capture time for a timestamp watermark, "YYYY-MM-DD HH:MM:SS"
    #[arg(long)]
    timestamp: Option<String>,

    /// Date layout for --timestamp
    #[arg(long, default_value = "yyyy-mm-dd")]
    date_format: String,

    /// Anchor position
    #[arg(short, long, default_value = "bottom-right")]
    position: WatermarkPosition,

    /// Margin from the edges in pixels
    #[arg(short, long, default_value_t = 20)]
    margin: u32,

    /// Explicit x of the watermark's top-left (requires --y)
    #[arg(long, requires = "y", allow_negative_numbers = true)]
    x: Option<i32>,

    /// Explicit y of the watermark's top-left (requires --x)
    #[arg(long, requires = "x", allow_negative_numbers = true)]
    y: Option<i32>,

    /// Font file for text and timestamp watermarks
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels (derived from the image when omitted)
    #[arg(long)]
    size: Option<u32>,

    /// Text color, hex or named
    #[arg(long, default_value = "white")]
    color: String,

    /// Opacity from 0.0 to 1.0
    #[arg(long, default_value_t = 0.8)]
    alpha: f32,

    /// Rotation in degrees, positive is clockwise
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotation: f32,

    /// Image watermark size as a percentage of its own size
    #[arg(long, default_value_t = 20.0)]
    scale: f32,

    /// Output format (defaults to each input's extension)
    #[arg(short, long)]
    format: Option<String>,

    /// Directory for the watermarked files
    #[arg(short, long)]
    out_dir: PathBuf,

    /// Print one JSON line per written image with the watermark's bbox
    #[arg(long)]
    report: bool,

    /// Input images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    photomark::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let spec = build_spec(&args)?;
    let position = match (args.x, args.y) {
        (Some(x), Some(y)) => PositionSpec::explicit(x, y),
        _ => PositionSpec::anchored(args.position, args.margin),
    };
    let format = match &args.format {
        Some(name) => Some(
            OutputFormat::from_extension(name)
                .with_context(|| format!("Unsupported output format '{}'", name))?,
        ),
        None => config.output_format,
    };

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    tracing::info!(
        kind = spec.kind(),
        inputs = args.inputs.len(),
        out_dir = %args.out_dir.display(),
        "Watermarking images"
    );

    let engine = WatermarkEngine::new(&config);
    let outcomes: Vec<(PathBuf, Result<Report>)> = args
        .inputs
        .par_iter()
        .map(|input| {
            let outcome = process_one(&engine, input, &spec, &position, format, &args.out_dir);
            (input.clone(), outcome)
        })
        .collect();

    let mut failures = Vec::new();
    for (input, outcome) in outcomes {
        match outcome {
            Ok(report) if args.report => println!("{}", serde_json::to_string(&report)?),
            Ok(_) => {}
            Err(e) => failures.push((input, e)),
        }
    }

    for (input, error) in &failures {
        tracing::error!(input = %input.display(), error = %format!("{:#}", error), "Failed to watermark image");
    }

    let done = args.inputs.len() - failures.len();
    tracing::info!(done, failed = failures.len(), "Finished");

    if !failures.is_empty() {
        bail!("{} of {} images failed", failures.len(), args.inputs.len());
    }
    Ok(())
}

fn build_spec(args: &Args) -> Result<WatermarkSpec> {
    let style = TextStyle {
        text: args.text.clone().unwrap_or_default().replace("\\n", "\n"),
        font_path: args.font.clone(),
        size: args.size,
        color: args.color.clone(),
        alpha: args.alpha,
        rotation: args.rotation,
        ..TextStyle::default()
    };

    if let Some(path) = &args.image {
        return Ok(WatermarkSpec::Image(ImageWatermarkStyle {
            scale: ScaleMode::Percentage {
                percent: args.scale,
            },
            alpha: args.alpha,
            rotation: args.rotation,
            ..ImageWatermarkStyle::new(path)
        }));
    }

    if let Some(timestamp) = &args.timestamp {
        let captured_at = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("Invalid --timestamp '{}'", timestamp))?;
        let date_format: DateFormat =
            serde_yaml::from_str(&args.date_format).with_context(|| {
                format!("Unknown --date-format '{}'", args.date_format)
            })?;
        return Ok(WatermarkSpec::Timestamp(TimestampStyle {
            captured_at: Some(captured_at),
            date_format,
            style,
        }));
    }

    Ok(WatermarkSpec::Text(style))
}

fn process_one(
    engine: &WatermarkEngine,
    input: &Path,
    spec: &WatermarkSpec,
    position: &PositionSpec,
    format: Option<OutputFormat>,
    out_dir: &Path,
) -> Result<Report> {
    let base: DynamicImage =
        image::open(input).with_context(|| format!("Failed to decode {}", input.display()))?;

    let format = match format {
        Some(format) => format,
        None => input
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or(OutputFormat::Png),
    };

    let result = engine.render_as(&base, spec, position, format);

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let output = out_dir.join(format!("{}.{}", stem, format.extension()));
    result
        .image
        .save_with_format(&output, format.image_format())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        bbox = ?result.bbox,
        "Wrote watermarked image"
    );
    Ok(Report {
        input: input.to_path_buf(),
        output,
        bbox: result.bbox,
    })
}
