#![warn(clippy::all)]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{value_t, App, Arg, ArgMatches};
use declutter_algorithms::{
    buffers::remove_clutter_from_buffer, config::DeclutterConfig, pipeline::Diagnostics,
    summary::RemovedOutput,
};
use log::{info, warn};
use pasture_core::{
    containers::{BorrowedBuffer, VectorBuffer},
    nalgebra::Vector3,
};
use pasture_derive::PointType;
use pasture_io::base::{read_all, write_all};

const DEFAULT_OUTPUT_FILE: &str = "cleaned.las";
const DEFAULT_OUTPUT_EXTENSION: &str = "las";

#[repr(C, packed)]
#[derive(PointType, Debug, Default, Clone, Copy, bytemuck::AnyBitPattern, bytemuck::NoUninit)]
struct CellCenter {
    #[pasture(BUILTIN_POSITION_3D)]
    pub position: Vector3<f64>,
}

struct Args {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub removed_file: Option<PathBuf>,
    pub config: DeclutterConfig,
}

/// Numeric parameters with their help texts, the names match the fields of `DeclutterConfig`
const FLOAT_PARAMETERS: &[(&str, &str)] = &[
    ("grid", "Horizontal cell size of the grid [default: 0.35]"),
    ("q_low", "Quantile of the cell heights used as ground [default: 0.02]"),
    ("q_high", "Quantile of the cell heights used as top of clutter [default: 0.90]"),
    ("h_min", "Minimum height above ground of clutter [default: 0.20]"),
    ("h_max", "Maximum height above ground of clutter [default: 3.0]"),
    ("min_len", "Minimum principal length of a component [default: 3.0]"),
    ("min_width", "Minimum principal width of a component [default: 1.4]"),
    ("max_width", "Maximum principal width of a component [default: 3.5]"),
    ("min_elong", "Minimum length to width ratio of a component [default: 2.2]"),
    ("hough_theta_step", "Angular resolution of the Hough transform in degrees [default: 5.0]"),
    ("hough_rho_bin", "Offset resolution of the Hough transform [default: 0.5]"),
    ("hough_min_len", "Minimum length of a Hough band [default: 8.0]"),
    ("hough_min_w", "Minimum width of a Hough band [default: 1.0]"),
    ("hough_max_w", "Maximum width of a Hough band [default: 4.5]"),
];

const INTEGER_PARAMETERS: &[(&str, &str)] = &[
    ("smooth_cells", "Radius in cells of the ground smoothing filter [default: 7]"),
    ("density_min", "Minimum number of points in a candidate cell [default: 5]"),
    ("hough_topk", "Maximum number of Hough peaks to validate [default: 8]"),
    ("hough_dilate", "Number of cells by which Hough bands are grown [default: 1]"),
];

macro_rules! override_parameter {
    ($matches:ident, $config:ident, $field:ident, $type:ty) => {
        if $matches.is_present(stringify!($field)) {
            $config.$field = value_t!($matches, stringify!($field), $type)
                .map_err(|e| anyhow!("Invalid value for --{}: {}", stringify!($field), e))?;
        }
    };
}

fn parameter_arg<'a>(name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .value_name("VALUE")
        .help(help)
}

fn load_config(matches: &ArgMatches) -> Result<DeclutterConfig> {
    let mut config = match matches.value_of("CONFIG") {
        Some(config_file) => {
            let json = std::fs::read_to_string(config_file)
                .with_context(|| format!("Could not read config file {}", config_file))?;
            serde_json::from_str::<DeclutterConfig>(&json)
                .with_context(|| format!("Could not parse config file {}", config_file))?
        }
        None => DeclutterConfig::default(),
    };

    override_parameter!(matches, config, grid, f64);
    override_parameter!(matches, config, q_low, f64);
    override_parameter!(matches, config, q_high, f64);
    override_parameter!(matches, config, smooth_cells, usize);
    override_parameter!(matches, config, h_min, f64);
    override_parameter!(matches, config, h_max, f64);
    override_parameter!(matches, config, min_len, f64);
    override_parameter!(matches, config, min_width, f64);
    override_parameter!(matches, config, max_width, f64);
    override_parameter!(matches, config, min_elong, f64);
    override_parameter!(matches, config, density_min, u32);
    override_parameter!(matches, config, hough_theta_step, f64);
    override_parameter!(matches, config, hough_rho_bin, f64);
    override_parameter!(matches, config, hough_topk, usize);
    override_parameter!(matches, config, hough_min_len, f64);
    override_parameter!(matches, config, hough_min_w, f64);
    override_parameter!(matches, config, hough_max_w, f64);
    override_parameter!(matches, config, hough_dilate, usize);

    if matches.is_present("use_hough") {
        config.use_hough = true;
    }
    if matches.is_present("debug_dump") {
        config.debug_dump = true;
    }
    Ok(config)
}

fn get_args() -> Result<Args> {
    let app = App::new("declutter")
        .version("0.1")
        .about("Removes elevated cables and long bands from a point cloud using a 2.5D height grid")
        .arg(
            Arg::with_name("INPUT")
                .long("in")
                .takes_value(true)
                .value_name("INPUT")
                .help("Input point cloud file")
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .long("out")
                .takes_value(true)
                .value_name("OUTPUT")
                .help("Output file for the kept points. If this is a directory, the points are written to cleaned.las inside it")
                .required(true),
        )
        .arg(
            Arg::with_name("REMOVED")
                .long("removed")
                .takes_value(true)
                .value_name("REMOVED")
                .help("Optional output file for the removed points"),
        )
        .arg(
            Arg::with_name("CONFIG")
                .long("config")
                .takes_value(true)
                .value_name("CONFIG")
                .help("JSON file with parameters. Explicit command line parameters take precedence"),
        )
        .arg(
            Arg::with_name("use_hough")
                .long("use_hough")
                .help("Additionally detect long bands with a Hough transform"),
        )
        .arg(
            Arg::with_name("debug_dump")
                .long("debug_dump")
                .help("Write the removed points and the centers of all removal cells next to the output file"),
        );
    let app = FLOAT_PARAMETERS
        .iter()
        .chain(INTEGER_PARAMETERS.iter())
        .fold(app, |app, &(name, help)| app.arg(parameter_arg(name, help)));
    let matches = app.get_matches();

    let input_file = PathBuf::from(
        matches
            .value_of("INPUT")
            .ok_or_else(|| anyhow!("Missing input file"))?,
    );
    let output_file = resolve_output_file(Path::new(
        matches
            .value_of("OUTPUT")
            .ok_or_else(|| anyhow!("Missing output file"))?,
    ));
    let removed_file = matches.value_of("REMOVED").map(PathBuf::from);
    let config = load_config(&matches)?;

    Ok(Args {
        input_file,
        output_file,
        removed_file,
        config,
    })
}

/// Directories receive a default file name, paths without an extension get the default extension
fn resolve_output_file(output: &Path) -> PathBuf {
    if output.is_dir() {
        return output.join(DEFAULT_OUTPUT_FILE);
    }
    if output.extension().is_none() {
        return output.with_extension(DEFAULT_OUTPUT_EXTENSION);
    }
    output.to_path_buf()
}

/// `<dir>/<stem><suffix>` next to `output_file`
fn sidecar_file(output_file: &Path, suffix: &str) -> PathBuf {
    let stem = output_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_file.with_file_name(format!("{}{}", stem, suffix))
}

fn sidecar_extension(output_file: &Path) -> String {
    output_file
        .extension()
        .map(|ex| ex.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_owned())
}

fn write_debug_dump(output_file: &Path, removed: &VectorBuffer, diagnostics: &Diagnostics) {
    let extension = sidecar_extension(output_file);

    let removed_file = sidecar_file(output_file, &format!("_removed.{}", extension));
    if let Err(why) = write_all(removed, &removed_file) {
        warn!(
            "Could not write removed points to {}: {}",
            removed_file.display(),
            why
        );
    }

    if diagnostics.keep_cell_centers.is_empty() {
        return;
    }
    let centers = diagnostics
        .keep_cell_centers
        .iter()
        .map(|position| CellCenter {
            position: *position,
        })
        .collect::<VectorBuffer>();
    let centers_file = sidecar_file(output_file, &format!("_keepcells_centers.{}", extension));
    match write_all(&centers, &centers_file) {
        Ok(_) => info!(
            "Wrote {} keep cell centers to {}",
            centers.len(),
            centers_file.display()
        ),
        Err(why) => warn!(
            "Could not write keep cell centers to {}: {}",
            centers_file.display(),
            why
        ),
    }
}

fn write_removed(removed: &VectorBuffer, removed_file: Option<&Path>) -> RemovedOutput {
    let removed_file = match removed_file {
        Some(file) => file,
        None => return RemovedOutput::NotRequested,
    };
    if removed.len() == 0 {
        info!("No points were removed, skipping {}", removed_file.display());
        return RemovedOutput::Empty;
    }
    match write_all(removed, removed_file) {
        Ok(_) => {
            info!(
                "Wrote {} removed points to {}",
                removed.len(),
                removed_file.display()
            );
            RemovedOutput::Written
        }
        Err(why) => {
            warn!(
                "Could not write removed points to {}: {}",
                removed_file.display(),
                why
            );
            RemovedOutput::Failed
        }
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;

    info!("Reading {}", args.input_file.display());
    let points = read_all::<VectorBuffer, _>(&args.input_file)
        .with_context(|| format!("Could not read points from {}", args.input_file.display()))?;

    let split = remove_clutter_from_buffer(&points, &args.config)
        .with_context(|| format!("Could not declutter {}", args.input_file.display()))?;

    write_all(&split.kept, &args.output_file).with_context(|| {
        format!(
            "Could not write kept points to {}",
            args.output_file.display()
        )
    })?;
    info!(
        "Wrote {} kept points to {}",
        split.kept.len(),
        args.output_file.display()
    );

    let removed_output = write_removed(&split.removed, args.removed_file.as_deref());

    if let Some(diagnostics) = split.result.diagnostics.as_ref() {
        write_debug_dump(&args.output_file, &split.removed, diagnostics);
    }

    let summary = split.result.summary.with_removed_output(removed_output);
    let summary_file = sidecar_file(&args.output_file, "_summary.json");
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&summary_file, json)
        .with_context(|| format!("Could not write summary to {}", summary_file.display()))?;

    println!(
        "Removed {} of {} points, summary written to {}",
        summary.removed_points,
        summary.input_points,
        summary_file.display()
    );

    Ok(())
}
