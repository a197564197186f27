// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::{Path, PathBuf};
use wpml_oxide_core::convert::{inspect, ConversionReport, InspectReport};
use wpml_oxide_core::{convert, ConvertOptions, DEFAULT_OUTPUT_NAME};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the waypoints of a seed KMZ with points from a GeoJSON file
    Convert {
        /// Seed KMZ exported from DJI Pilot 2
        #[arg(short, long)]
        seed: PathBuf,
        /// GeoJSON point layer (e.g. exported from QGIS)
        #[arg(short, long)]
        points: PathBuf,
        /// Altitude in meters applied to every waypoint
        #[arg(short, long, env = "WPML_ALTITUDE")]
        altitude: Option<f64>,
        /// Where to write the new KMZ
        #[arg(short, long, default_value = DEFAULT_OUTPUT_NAME)]
        output: PathBuf,
        /// Print the conversion report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the entries of a seed KMZ and the route found in each mission document
    Inspect {
        seed: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialize logging")
}

fn read_input(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {} {:?}", what, path))
}

fn print_conversion(report: &ConversionReport, output: &Path) {
    println!("Converted {} waypoints -> {:?}", report.points, output);
    for doc in &report.documents {
        println!(
            "  {} ({:?}): {} -> {} placemarks (+{} / -{})",
            doc.entry,
            doc.dialect,
            doc.records_found,
            doc.records_written,
            doc.added(),
            doc.removed()
        );
    }
    for (i, line) in report.preview.iter().enumerate() {
        println!("  Waypoint {}: {}", i + 1, line);
    }
    if report.points > report.preview.len() {
        println!("  ... and {} more waypoints", report.points - report.preview.len());
    }
}

fn print_inspection(report: &InspectReport) {
    for entry in &report.entries {
        let marker = if entry.rewritten { "*" } else { " " };
        println!(
            "{} {:<40} {:>10} {:>10} {}",
            marker, entry.path, entry.size, entry.compressed_size, entry.compression
        );
    }
    for route in &report.routes {
        match (&route.problem, route.records) {
            (Some(problem), _) => println!("{} ({:?}): {}", route.entry, route.dialect, problem),
            (None, Some(records)) => println!(
                "{} ({:?}): route with {} placemarks, score {}, namespace {}",
                route.entry,
                route.dialect,
                records,
                route.score.unwrap_or_default(),
                route.vendor_namespace.as_deref().unwrap_or("-")
            ),
            (None, None) => println!("{} ({:?}): no route", route.entry, route.dialect),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Convert {
            seed,
            points,
            altitude,
            output,
            json,
        } => {
            let seed_bytes = read_input(&seed, "seed archive")?;
            let points_bytes = read_input(&points, "point file")?;
            let options = ConvertOptions::default().with_altitude_override(altitude);

            let result = convert(seed_bytes, &points_bytes, &options)
                .with_context(|| format!("Conversion of {:?} failed", seed))?;
            fs::write(&output, &result.archive)
                .with_context(|| format!("Failed to write {:?}", output))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.report)?);
            } else {
                print_conversion(&result.report, &output);
            }
        }
        Commands::Inspect { seed, json } => {
            let report = inspect(read_input(&seed, "seed archive")?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_inspection(&report);
            }
        }
    }

    Ok(())
}
