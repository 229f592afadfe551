//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::{ImbalanceVariant, LifecycleVariant, TypologyPolicy};
use crate::config::AnalysisConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// RegionLens - district-level insights from registry transaction batches
///
/// Aggregates enrolment, demographic-update and biometric-update records
/// per district, derives ratio metrics, classifies each district into a
/// typology and exports JSON for the dashboard.
///
/// Examples:
///   regionlens --datasets ./datasets --output-dir static/data
///   regionlens --remote --report report.md
///   regionlens --region Pune
///   regionlens --profile precompute --format json --report report.json
///   regionlens --dry-run
///   regionlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Root directory holding the three dataset folders
    ///
    /// Defaults to `datasets` or the value in .regionlens.toml.
    #[arg(short, long, value_name = "DIR", env = "REGIONLENS_DATASETS")]
    pub datasets: Option<PathBuf>,

    /// Fetch the CSV batches over HTTP instead of reading local files
    #[arg(long, action = ArgAction::SetTrue, env = "USE_REMOTE")]
    pub remote: bool,

    /// Base URL for remote mode
    #[arg(long, value_name = "URL", env = "REGIONLENS_BASE_URL")]
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds (remote mode)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .regionlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving the exported JSON files
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write a corpus report to this file
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Print the detail view of one region and exit
    ///
    /// Accepts a bare district name or `state|district`.
    #[arg(long, value_name = "NAME")]
    pub region: Option<String>,

    /// Variant profile: live (relative/ratio/signed) or
    /// precompute (absolute/normalized/unsigned)
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<Profile>,

    /// Typology policy, overriding the profile
    #[arg(long, value_name = "POLICY")]
    pub typology: Option<TypologyPolicy>,

    /// Lifecycle integrity variant, overriding the profile
    #[arg(long, value_name = "VARIANT")]
    pub lifecycle: Option<LifecycleVariant>,

    /// Maintenance imbalance variant, overriding the profile
    #[arg(long, value_name = "VARIANT")]
    pub imbalance: Option<ImbalanceVariant>,

    /// Number of regions listed in each ranked report section
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the files or URLs that would be loaded and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .regionlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Named combinations of the metric and typology variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Relative typology, ratio lifecycle, signed imbalance
    Live,
    /// Absolute typology, normalized lifecycle, unsigned imbalance
    Precompute,
}

impl Profile {
    pub fn analysis(self) -> AnalysisConfig {
        match self {
            Profile::Live => AnalysisConfig::default(),
            Profile::Precompute => AnalysisConfig::precompute(),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("Top must be at least 1".to_string());
        }

        if let Some(ref region) = self.region {
            if region.trim().is_empty() {
                return Err("Region name must not be empty".to_string());
            }
        }

        // Remote mode never touches the local tree
        if !self.remote {
            if let Some(ref datasets) = self.datasets {
                if !datasets.is_dir() {
                    return Err(format!(
                        "Datasets directory does not exist: {}",
                        datasets.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
