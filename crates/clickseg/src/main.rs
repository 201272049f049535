//! clickseg: replay a click session against a precomputed mask and export
//! the results.
//!
//! Loads an image, feeds the given include/exclude clicks through the
//! interactive segmenter (the engine answers with a mask file instead of
//! running a model), then writes any of:
//!
//! - the cut-out (optionally trimmed to content),
//! - the standalone mask image,
//! - an overlay preview with click markers,
//! - the mask's bounding box as JSON on stdout.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin clickseg -- photo.jpg --mask mask.png \
//!     --click 120,80 --click 40,30,exclude --output cutout.png --trim
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod replay;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use clickseg_core::compositor::{compute_bounds, mask_to_image};
use clickseg_core::{
    Click, ClickType, CutoutOptions, DisplayRect, Rgb, RgbaImage, Segmenter, SegmenterConfig,
    SegmenterError,
};
use clickseg_export::ImageFormat;
use futures::executor::block_on;
use tracing_subscriber::EnvFilter;

use crate::replay::{ReplayEngine, mask_from_image};

/// Replay clicks against a precomputed mask and export cut-outs.
#[derive(Parser)]
#[command(name = "clickseg", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Precomputed mask. Alpha is used when present, luma otherwise.
    #[arg(long)]
    mask: PathBuf,

    /// Click in image pixels as `X,Y` or `X,Y,include|exclude`.
    ///
    /// Repeat for several clicks. Without any click a single include
    /// click at the image center is used.
    #[arg(long = "click", value_parser = parse_click)]
    clicks: Vec<Click>,

    /// Write the cut-out here; the format follows the extension.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Crop the cut-out to the selected pixels.
    #[arg(long)]
    trim: bool,

    /// Transparent margin kept around a trimmed cut-out, in pixels.
    #[arg(long, default_value_t = 0)]
    padding: u32,

    /// Output format, overriding the file extension (png, jpeg, webp).
    #[arg(long)]
    format: Option<ImageFormat>,

    /// JPEG quality in `0.0..=1.0`.
    #[arg(long)]
    quality: Option<f32>,

    /// Write the standalone mask image here.
    #[arg(long)]
    mask_output: Option<PathBuf>,

    /// Write the overlay preview (with click markers) here.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Print the mask's bounding box as JSON on stdout.
    #[arg(long)]
    bounds_json: bool,

    /// Overlay opacity in `0.0..=1.0`.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_OVERLAY_OPACITY)]
    overlay_opacity: f32,

    /// Overlay color as CSS hex.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_OVERLAY_COLOR)]
    overlay_color: Rgb,

    /// Marker diameter in pixels.
    #[arg(long, default_value_t = SegmenterConfig::DEFAULT_MARKER_SIZE)]
    marker_size: f64,

    /// Leave click markers out of the preview.
    #[arg(long)]
    no_markers: bool,

    /// Full segmenter config as a JSON string.
    ///
    /// When provided, the individual config flags are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Parse `X,Y` or `X,Y,KIND`.
fn parse_click(s: &str) -> Result<Click, String> {
    let mut parts = s.split(',').map(str::trim);
    let (Some(x), Some(y)) = (parts.next(), parts.next()) else {
        return Err(format!("click must be 'X,Y' or 'X,Y,KIND', got: '{s}'"));
    };
    let x: f64 = x.parse().map_err(|e| format!("invalid click X '{x}': {e}"))?;
    let y: f64 = y.parse().map_err(|e| format!("invalid click Y '{y}': {e}"))?;
    let kind = match parts.next() {
        Some(kind) => kind.parse::<ClickType>()?,
        None => ClickType::Include,
    };
    if parts.next().is_some() {
        return Err(format!("too many fields in click '{s}'"));
    }
    Ok(Click::new(x, y, kind))
}

/// Build a [`SegmenterConfig`] from CLI arguments.
fn config_from_cli(cli: &Cli) -> Result<SegmenterConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(SegmenterConfig {
        overlay_opacity: cli.overlay_opacity,
        overlay_color: cli.overlay_color,
        marker_size: cli.marker_size,
        show_markers: !cli.no_markers,
        ..SegmenterConfig::default()
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let mask_file = image::open(&cli.mask)
        .map_err(|e| format!("Error reading mask {}: {e}", cli.mask.display()))?;
    let image_bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;

    let segmenter = Segmenter::new(ReplayEngine::new(mask_from_image(mask_file)), config)
        .map_err(|e| format!("Invalid config: {e}"))?;
    segmenter.subscribe(|event| tracing::debug!(event = event.name(), "segmenter event"));

    block_on(async {
        segmenter.start().await?;
        segmenter.load_image(image_bytes).await?;
        if cli.clicks.is_empty() {
            segmenter.segment_everything().await
        } else {
            segmenter.segment_with_clicks(&cli.clicks).await
        }
    })
    .map_err(|e: SegmenterError| format!("Segmentation failed ({}): {e}", e.kind()))?;

    let result = write_outputs(cli, &segmenter);
    block_on(segmenter.teardown());
    result
}

fn write_outputs(cli: &Cli, segmenter: &Segmenter<ReplayEngine>) -> Result<(), String> {
    let mask = segmenter.mask();
    if mask.is_none() {
        eprintln!("No pixels selected.");
    }

    if let Some(ref path) = cli.output {
        let options = CutoutOptions {
            trim_to_content: cli.trim,
            padding: cli.padding,
        };
        let cutout = segmenter
            .extract_mask(options)
            .ok_or("Nothing to cut out: the mask is empty")?;
        write_image(path, &cutout, cli.format, cli.quality)?;
    }

    if let Some(ref path) = cli.mask_output {
        let mask = mask.as_ref().ok_or("No mask to write")?;
        write_image(path, &mask_to_image(mask), cli.format, None)?;
    }

    if let Some(ref path) = cli.preview {
        let preview = segmenter.preview().ok_or("No image loaded")?;
        let rect = DisplayRect::at_origin(f64::from(preview.width()), f64::from(preview.height()));
        let annotated = clickseg_export::render_markers(&preview, &segmenter.markers(rect));
        write_image(path, &annotated, cli.format, cli.quality)?;
    }

    if cli.bounds_json {
        let bounds = mask.as_ref().and_then(compute_bounds);
        let json = serde_json::to_string_pretty(&bounds)
            .map_err(|e| format!("Error serializing bounds: {e}"))?;
        println!("{json}");
    }

    Ok(())
}

fn write_image(
    path: &Path,
    image: &RgbaImage,
    format: Option<ImageFormat>,
    quality: Option<f32>,
) -> Result<(), String> {
    let format = format
        .or_else(|| path.to_str().and_then(ImageFormat::from_filename))
        .unwrap_or_default();
    let encoded = clickseg_export::encode(image, format, quality)
        .map_err(|e| format!("Error encoding {}: {e}", path.display()))?;
    std::fs::write(path, &encoded.bytes)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!(
        "Wrote {} ({}, {} bytes)",
        path.display(),
        encoded.mime_type(),
        encoded.bytes.len()
    );
    Ok(())
}
