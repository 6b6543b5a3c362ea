//! bfgeo-import: import GeoJSON layers and reproject them to WGS84.

mod ingest;

use anyhow::Context;
use bfgeo_core::config::{Config, ConfigSchema};
use bfgeo_core::{exit_codes, Error};
use bfgeo_epsg_client::{ClientConfig, EpsgClient};
use bfgeo_geo::{
    identify_collection, Coordinate, ReprojectionReport, Reprojector, ResolutionSource, Resolver,
    TransformOutcome, Transformer,
};
use bfgeo_telemetry::{metrics, TelemetryConfig, Timer};
use clap::{Parser, Subcommand};
use ingest::{default_output_path, layer_name, load_collection, Layer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolver lookup tier used by the CLI; `None` when running offline.
type Lookup = Option<EpsgClient>;

#[derive(Parser)]
#[command(name = "bfgeo-import")]
#[command(about = "Import GeoJSON layers and reproject them to WGS84")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to .bfgeo.toml, bfgeo.toml or .config/bfgeo.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never contact the definition service
    #[arg(long, global = true)]
    offline: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print collected metrics as JSON on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reproject a file and write the result as GeoJSON
    Convert {
        /// Input file (.geojson, .json; other formats become a placeholder)
        input: PathBuf,
        /// Output path (defaults to <stem>.wgs84.geojson next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
        /// Print the reprojection report as JSON
        #[arg(long)]
        report: bool,
    },
    /// Show which CRS a file is in, without transforming
    Detect {
        /// Input file
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the projection definition for an EPSG code
    Resolve {
        /// EPSG code, e.g. 6346
        code: String,
    },
    /// Transform a single coordinate
    Point {
        /// Easting or longitude
        #[arg(allow_negative_numbers = true)]
        x: f64,
        /// Northing or latitude
        #[arg(allow_negative_numbers = true)]
        y: f64,
        /// Source EPSG code
        #[arg(long)]
        from: String,
        /// Target EPSG code
        #[arg(long, default_value = bfgeo_geo::WGS84)]
        to: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err
            .downcast_ref::<Error>()
            .map_or(exit_codes::FAILURE, Error::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let schema = config.schema;

    let telemetry = TelemetryConfig::default()
        .with_log_level(cli.log_level.as_deref().unwrap_or(&schema.logging.level))
        .with_json(cli.json_logs || schema.logging.json);
    bfgeo_telemetry::init_with_config(telemetry)?;

    if let Some(path) = &config.path {
        info!(path = %path.display(), "Loaded configuration");
    }

    let reprojector = build_reprojector(&schema, cli.offline)?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            pretty,
            report,
        } => convert(&reprojector, &input, output, pretty, report).await?,
        Commands::Detect { input, json } => detect(&input, json)?,
        Commands::Resolve { code } => resolve(&reprojector, &code).await?,
        Commands::Point { x, y, from, to } => point(&reprojector, x, y, &from, &to).await,
    }

    metrics().gauge(
        "resolver.cache.entries",
        reprojector.transformer().resolver().cache().len() as u64,
    );
    if cli.metrics {
        println!("{}", serde_json::to_string_pretty(&metrics().export_json())?);
    }

    Ok(())
}

fn build_reprojector(schema: &ConfigSchema, offline: bool) -> anyhow::Result<Reprojector<Lookup>> {
    let lookup = if offline || !schema.lookup.enabled {
        info!("Definition lookups disabled");
        None
    } else {
        let client_config = ClientConfig::from(&schema.lookup)
            .with_env_overrides()
            .context("Invalid definition service settings")?;
        Some(EpsgClient::with_config(client_config)?)
    };

    Ok(Reprojector::new(Transformer::new(Resolver::new(lookup)))
        .with_target_crs(schema.reproject.target_crs.clone())
        .with_projected_passthrough_warning(schema.reproject.warn_on_projected_passthrough))
}

async fn convert(
    reprojector: &Reprojector<Lookup>,
    input: &Path,
    output: Option<PathBuf>,
    pretty: bool,
    print_report: bool,
) -> anyhow::Result<()> {
    let collection = load_collection(input)?;

    let timer = Timer::start("reproject.duration_ms");
    let (collection, report) = reprojector.reproject_collection(collection).await;
    timer.stop();
    record_report(&report);

    let layer = Layer::new(layer_name(input), collection);
    let output = output.unwrap_or_else(|| default_output_path(input));
    let body = if pretty {
        serde_json::to_string_pretty(&layer.data)?
    } else {
        serde_json::to_string(&layer.data)?
    };
    std::fs::write(&output, body)
        .map_err(Error::from)
        .with_context(|| format!("Writing {}", output.display()))?;

    info!(
        layer = %layer.name,
        id = %layer.id,
        output = %output.display(),
        features = report.features,
        "Layer written"
    );

    for diagnostic in &report.diagnostics {
        eprintln!("warning: {}", serde_json::to_string(diagnostic)?);
    }

    if print_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} -> {} ({} features, {} exact, {} approximate)",
            input.display(),
            output.display(),
            report.features,
            report.coordinates.exact,
            report.coordinates.approximate,
        );
    }

    Ok(())
}

fn record_report(report: &ReprojectionReport) {
    let registry = metrics();
    registry.increment("reproject.collections");
    registry.increment_by("reproject.coordinates.exact", report.coordinates.exact as u64);
    registry.increment_by(
        "reproject.coordinates.approximate",
        report.coordinates.approximate as u64,
    );
    registry.increment_by(
        "reproject.coordinates.unrecognized",
        report.coordinates.unrecognized as u64,
    );
    registry.increment_by("reproject.diagnostics", report.diagnostics.len() as u64);
}

fn detect(input: &Path, json: bool) -> anyhow::Result<()> {
    let collection = load_collection(input)?;
    let identification = identify_collection(&collection);

    if json {
        println!("{}", serde_json::to_string_pretty(&identification)?);
    } else {
        println!("Source: {:?}", identification.source);
        match &identification.code {
            Some(code) => println!("CRS: EPSG:{code}"),
            None => println!("CRS: unknown"),
        }
        if let Some(sample) = &identification.sample {
            println!("Sample: {sample:?}");
        }
    }

    Ok(())
}

async fn resolve(reprojector: &Reprojector<Lookup>, code: &str) -> anyhow::Result<()> {
    let resolution = reprojector
        .transformer()
        .resolver()
        .resolve_with_source(code)
        .await
        .ok_or_else(|| Error::unknown_crs(code))?;

    let source = match resolution.source {
        ResolutionSource::Cache => "cache",
        ResolutionSource::WellKnown => "built-in table",
        ResolutionSource::Lookup => "definition service",
    };
    println!("EPSG:{code} ({source})");
    println!("{}", resolution.definition);

    Ok(())
}

async fn point(reprojector: &Reprojector<Lookup>, x: f64, y: f64, from: &str, to: &str) {
    let (coord, outcome) = reprojector
        .transformer()
        .transform_coordinate(Coordinate::new(x, y), from, to)
        .await;

    match outcome {
        TransformOutcome::Exact => println!("{} {}", coord.x, coord.y),
        TransformOutcome::Fallback(kind) => {
            println!("{} {}", coord.x, coord.y);
            eprintln!("warning: approximate result ({kind:?})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_point_accepts_negative_numbers() {
        let cli = Cli::try_parse_from(["bfgeo-import", "point", "-79.4", "43.7", "--from", "4326"])
            .unwrap();
        let Commands::Point { x, y, from, to } = cli.command else {
            panic!("expected point");
        };
        assert_eq!((x, y), (-79.4, 43.7));
        assert_eq!(from, "4326");
        assert_eq!(to, "4326");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bfgeo-import", "resolve", "6346", "--offline", "--metrics"])
            .unwrap();
        assert!(cli.offline);
        assert!(cli.metrics);
    }

    #[test]
    fn test_offline_reprojector_has_no_lookup() {
        let reprojector = build_reprojector(&ConfigSchema::default(), true).unwrap();
        assert!(reprojector.transformer().resolver().lookup().is_none());
        assert_eq!(reprojector.target_crs(), "4326");
    }

    #[test]
    fn test_record_report() {
        let report = ReprojectionReport {
            crs_source: bfgeo_geo::CrsSource::Declared,
            source_crs: Some("6346".into()),
            target_crs: "4326".into(),
            transformed: true,
            features: 1,
            coordinates: bfgeo_geo::TransformReport {
                exact: 3,
                ..Default::default()
            },
            diagnostics: Vec::new(),
        };
        let before = metrics().counter("reproject.coordinates.exact");
        record_report(&report);
        assert_eq!(metrics().counter("reproject.coordinates.exact"), before + 3);
    }
}
