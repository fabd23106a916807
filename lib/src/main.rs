//! stack-slicer CLI
//!
//! Usage:
//!   stack-slicer slice <mesh.json> -o <output.gcode> [options]
//!   stack-slicer slice <mesh.json> --config my_config.json
//!   stack-slicer info <mesh.json>
//!   stack-slicer prism -o prism.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use stack_slicer::pipeline::{CancelToken, PrintPipeline, ProgressPhase};
use stack_slicer::slice::plan_layers;
use stack_slicer::{InfillKind, Mesh, PipelineConfig, Point, SliceReport};
use std::fs;
use std::path::{Path, PathBuf};

/// Layered mesh slicer and toolpath writer
#[derive(Parser, Debug)]
#[command(name = "stack-slicer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice a JSON mesh and write a toolpath program
    Slice {
        /// Input mesh (JSON triangle list)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output toolpath file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Pipeline configuration file (JSON); flags below override it
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Layer height in mm
        #[arg(long)]
        layer_height: Option<f64>,

        /// Nozzle diameter in mm
        #[arg(long)]
        nozzle: Option<f64>,

        /// Filament diameter in mm
        #[arg(long)]
        filament: Option<f64>,

        /// Number of shells
        #[arg(long)]
        shells: Option<usize>,

        /// Infill pattern (none, single, single_rotated, rectangle, square,
        /// diamond, triangles, tri_hexagons)
        #[arg(long)]
        infill: Option<InfillKind>,

        /// Infill spacing as a multiple of the nozzle diameter
        #[arg(long)]
        spacing: Option<f64>,

        /// Fixed number of layers
        #[arg(long)]
        layers: Option<usize>,

        /// Drop empty layers below the part
        #[arg(long)]
        trim: bool,

        /// Number of threads (0 = auto)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },

    /// Show mesh information
    Info {
        /// Input mesh (JSON triangle list)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Layer height used for the layer count
        #[arg(long, default_value = "0.2")]
        layer_height: f64,
    },

    /// Write a triangular prism mesh, handy as test input
    Prism {
        /// Output mesh file
        #[arg(short, long, value_name = "OUTPUT", default_value = "prism.json")]
        output: PathBuf,

        /// Side length of the base triangle in mm
        #[arg(long, default_value = "20")]
        size: f64,

        /// Height in mm
        #[arg(long, default_value = "10")]
        height: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Slice {
            input,
            output,
            config,
            layer_height,
            nozzle,
            filament,
            shells,
            infill,
            spacing,
            layers,
            trim,
            threads,
        } => {
            let mut pipeline_config = match config {
                Some(path) => {
                    info!("Loading config from: {}", path.display());
                    PipelineConfig::from_json_file(&path)
                        .with_context(|| format!("Failed to load config {}", path.display()))?
                }
                None => PipelineConfig::default(),
            };

            let slice = &mut pipeline_config.slice;
            if let Some(v) = layer_height {
                slice.layer_height = v;
            }
            if let Some(v) = nozzle {
                slice.nozzle_diameter = v;
            }
            if let Some(v) = filament {
                slice.filament_diameter = v;
            }
            if let Some(v) = shells {
                slice.shell_count = v;
            }
            if let Some(v) = infill {
                slice.infill_kind = v;
            }
            if let Some(v) = spacing {
                slice.infill_spacing = v;
            }
            if layers.is_some() {
                slice.layer_count = layers;
            }
            if trim {
                slice.trim_leading_empty = true;
            }
            if threads > 0 {
                pipeline_config.threads = Some(threads);
            }

            let output = output.unwrap_or_else(|| input.with_extension("gcode"));
            slice_command(input, output, pipeline_config)
        }
        Commands::Info {
            input,
            layer_height,
        } => info_command(input, layer_height),
        Commands::Prism {
            output,
            size,
            height,
        } => prism_command(output, size, height),
    }
}

fn load_mesh(input: &Path) -> Result<Mesh> {
    info!("Loading mesh: {}", input.display());
    let mesh = Mesh::from_json_file(input)
        .with_context(|| format!("Failed to load mesh {}", input.display()))?;
    info!("  Triangles: {}", mesh.len());
    Ok(mesh)
}

fn slice_command(input: PathBuf, output: PathBuf, config: PipelineConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    info!("Using {}", config);

    let mesh = load_mesh(&input)?;
    let pipeline = PrintPipeline::new(config);

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let (tx, rx) = pipeline.progress_channel();
    let cancel = CancelToken::new();

    let report = std::thread::scope(|scope| {
        let bar = progress.clone();
        scope.spawn(move || {
            let (mut contour, mut finish) = (0, 0);
            for event in rx {
                match event.phase {
                    ProgressPhase::Contour => {
                        bar.set_message("contours");
                        contour = contour.max(event.completed);
                    }
                    ProgressPhase::Finish => {
                        bar.set_message("walls and infill");
                        finish = finish.max(event.completed);
                    }
                }
                bar.set_length((event.total * 2) as u64);
                bar.set_position((contour + finish) as u64);
            }
        });
        pipeline.slice_with(&mesh, &cancel, Some(tx))
    })
    .context("Slicing failed")?;

    progress.finish_with_message("sliced");
    print_report(&report);

    if report.cancelled {
        bail!("Slicing was cancelled");
    }

    let toolpath = pipeline.write_toolpath(&report);
    toolpath
        .write_to_file(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {}", output.display());
    println!("  {}", toolpath.stats);
    Ok(())
}

fn print_report(report: &SliceReport) {
    let done = report.layers().count();
    println!(
        "Layers: {} of {} finished ({} trimmed), {} warnings, {:.2?}",
        done,
        report.stack.len(),
        report.trimmed,
        report.warnings,
        report.timings.total
    );
    for error in report.failures() {
        warn!("{}", error);
    }
    for layer in report.layers().filter(|l| !l.issues.is_empty()) {
        for issue in &layer.issues {
            info!("Layer {}: {}", layer.index, issue);
        }
    }
}

fn info_command(input: PathBuf, layer_height: f64) -> Result<()> {
    let mesh = load_mesh(&input)?;
    mesh.validate().context("Invalid mesh")?;

    println!("Mesh: {}", input.display());
    println!("  Triangles: {}", mesh.len());
    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "  Bounding box: ({:.2}, {:.2}, {:.2}) - ({:.2}, {:.2}, {:.2})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        println!(
            "  Size: {:.2} x {:.2} x {:.2} mm",
            max.x - min.x,
            max.y - min.y,
            max.z - min.z
        );
    }
    let plans = plan_layers(&mesh, layer_height, None).context("Failed to plan layers")?;
    println!("  Layers at {} mm: {}", layer_height, plans.len());
    Ok(())
}

fn prism_command(output: PathBuf, size: f64, height: f64) -> Result<()> {
    if !(size > 0.0 && height > 0.0) {
        bail!("size and height must be positive");
    }
    let mesh = Mesh::triangular_prism(
        Point::new(0.0, 0.0),
        Point::new(size, 0.0),
        Point::new(size / 2.0, size * 3f64.sqrt() / 2.0),
        0.0,
        height,
    );
    let json = mesh.to_json().context("Failed to serialize mesh")?;
    fs::write(&output, json).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} triangles to {}", mesh.len(), output.display());
    Ok(())
}
