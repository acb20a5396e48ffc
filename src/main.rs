//! trimesh-calibrate - map raw input points through a calibration mesh
//!
//! Loads a triangle mesh from a TOML config and maps query points from the
//! command line or stdin, writing one JSON object per point to stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trimesh_calibrate::{Config, MappingResult, Point2D, TriangleMeshCalibrator};

/// trimesh-calibrate - piecewise-affine point calibration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Points to map, as `x,y`. Reads `x y` lines from stdin when omitted
    #[arg(allow_hyphen_values = true)]
    points: Vec<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "calibration.toml")]
    config: PathBuf,

    /// Fall back to the nearest cell instead of reporting not_found
    #[arg(short, long)]
    nearest: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct MappedLine {
    query: Point2D,
    #[serde(flatten)]
    result: MappingResult,
}

#[derive(Serialize)]
struct NearestLine {
    query: Point2D,
    point: Option<Point2D>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    info!("trimesh-calibrate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_create(&args.config)?;
    let calibrator = config.build_calibrator()?;
    info!("Calibration mesh ready with {} cells", calibrator.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.points.is_empty() {
        let queries = args
            .points
            .iter()
            .map(|s| parse_point(s))
            .collect::<Result<Vec<_>>>()?;

        if args.nearest {
            for &q in &queries {
                emit_nearest(&mut out, &calibrator, q)?;
            }
        } else {
            for (&query, result) in queries.iter().zip(calibrator.map_all(&queries)) {
                emit(&mut out, &MappedLine { query, result })?;
            }
        }
        return Ok(());
    }

    debug!("Reading query points from stdin");
    for (lineno, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let query = match parse_point(&line) {
            Ok(q) => q,
            Err(e) => {
                warn!("Skipping line {}: {}", lineno + 1, e);
                continue;
            }
        };

        if args.nearest {
            emit_nearest(&mut out, &calibrator, query)?;
        } else {
            let result = calibrator.map(query);
            emit(&mut out, &MappedLine { query, result })?;
        }
    }

    Ok(())
}

fn emit_nearest(
    out: &mut impl Write,
    calibrator: &TriangleMeshCalibrator,
    query: Point2D,
) -> Result<()> {
    let point = calibrator.map_or_nearest(query);
    emit(out, &NearestLine { query, point })
}

fn emit<T: Serialize>(out: &mut impl Write, line: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, line).context("Failed to encode result")?;
    writeln!(out).context("Failed to write result")?;
    Ok(())
}

/// Parse `x,y`, `x y` or `x, y`
fn parse_point(s: &str) -> Result<Point2D> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let [x, y] = parts.as_slice() else {
        bail!("expected two coordinates, got {:?}", s);
    };
    let x: f64 = x.parse().with_context(|| format!("invalid x coordinate {:?}", x))?;
    let y: f64 = y.parse().with_context(|| format!("invalid y coordinate {:?}", y))?;
    if !x.is_finite() || !y.is_finite() {
        bail!("coordinates must be finite: {:?}", s);
    }
    Ok(Point2D::new(x, y))
}
