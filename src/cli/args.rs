//! Command line argument parsing for the geofacet CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Geofacet - faceted, location-biased restaurant search
#[derive(Parser, Debug, Clone)]
#[command(name = "geofacet")]
#[command(about = "Faceted, location-biased search from the command line")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct GeofacetArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl GeofacetArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one search over a local dataset and page through it
    Search(SearchArgs),

    /// Drive a live search session from stdin
    Interactive(InteractiveArgs),
}

/// Arguments for a one-shot search
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Restaurant dataset (JSON array)
    #[arg(short, long, value_name = "DATASET_FILE")]
    pub dataset: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "GEOFACET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Free-text query
    #[arg(long, default_value = "")]
    pub query: String,

    /// Facet refinement as FACET=VALUE; may be repeated
    #[arg(short, long = "refine", value_name = "FACET=VALUE")]
    pub refinements: Vec<RefineArg>,

    /// Number of pages to fetch
    #[arg(short, long, default_value = "1")]
    pub pages: u32,

    /// Hits per page
    #[arg(long)]
    pub hits_per_page: Option<usize>,

    /// Latitude of the user position
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the user position
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

/// Arguments for an interactive session
#[derive(Parser, Debug, Clone)]
pub struct InteractiveArgs {
    /// Restaurant dataset (JSON array); without it the hosted service is used
    #[arg(short, long, value_name = "DATASET_FILE", required_unless_present = "config")]
    pub dataset: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "GEOFACET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hits per page
    #[arg(long)]
    pub hits_per_page: Option<usize>,

    /// Latitude reported as the device position
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude reported as the device position
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Skip the IP geolocation lookup
    #[arg(long)]
    pub no_ip_lookup: bool,
}

/// A `FACET=VALUE` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineArg {
    pub facet: String,
    pub value: String,
}

impl FromStr for RefineArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((facet, value)) if !facet.trim().is_empty() && !value.is_empty() => {
                Ok(RefineArg {
                    facet: facet.trim().to_string(),
                    value: value.to_string(),
                })
            }
            _ => Err(format!("expected FACET=VALUE, got {s:?}")),
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
