//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.regionlens.toml` files.

use crate::analysis::{ImbalanceVariant, LifecycleVariant, TypologyPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".regionlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Raw dataset source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Metric and classification variants.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory receiving the exported JSON artefacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> String {
    "static/data".to_string()
}

/// Where raw CSV batches come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Read every `*.csv` under the per-kind dataset folders.
    #[default]
    Local,
    /// Fetch the configured file lists over HTTP.
    Remote,
}

/// Raw dataset source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// Root directory containing the per-kind dataset folders.
    #[serde(default = "default_datasets_path")]
    pub datasets_path: String,

    /// Base URL for remote mode; files are fetched from `<base_url>/<folder>/<file>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_enrolment_files")]
    pub enrolment_files: Vec<String>,

    #[serde(default = "default_demographic_files")]
    pub demographic_files: Vec<String>,

    #[serde(default = "default_biometric_files")]
    pub biometric_files: Vec<String>,

    /// Per-request timeout in seconds for remote mode.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            datasets_path: default_datasets_path(),
            base_url: default_base_url(),
            enrolment_files: default_enrolment_files(),
            demographic_files: default_demographic_files(),
            biometric_files: default_biometric_files(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_datasets_path() -> String {
    "datasets".to_string()
}

fn default_base_url() -> String {
    "https://raw.githubusercontent.com/natyavidhan/uidai-hackathon/master/datasets".to_string()
}

fn file_list(prefix: &str, bounds: &[u32]) -> Vec<String> {
    bounds
        .windows(2)
        .map(|w| format!("{}_{}_{}.csv", prefix, w[0], w[1]))
        .collect()
}

fn default_enrolment_files() -> Vec<String> {
    file_list(
        "api_data_aadhar_enrolment",
        &[0, 500_000, 1_000_000, 1_006_029],
    )
}

fn default_demographic_files() -> Vec<String> {
    file_list(
        "api_data_aadhar_demographic",
        &[0, 500_000, 1_000_000, 1_500_000, 2_000_000, 2_071_700],
    )
}

fn default_biometric_files() -> Vec<String> {
    file_list(
        "api_data_aadhar_biometric",
        &[0, 500_000, 1_000_000, 1_500_000, 1_861_108],
    )
}

fn default_timeout() -> u64 {
    30
}

/// Metric and classification variant selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub typology: TypologyPolicy,

    #[serde(default)]
    pub lifecycle: LifecycleVariant,

    #[serde(default)]
    pub imbalance: ImbalanceVariant,
}

impl AnalysisConfig {
    /// The combination used by the offline precompute path.
    pub fn precompute() -> Self {
        Self {
            typology: TypologyPolicy::Absolute,
            lifecycle: LifecycleVariant::NormalizedPercentage,
            imbalance: ImbalanceVariant::Unsigned,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of regions listed in the ranked report tables.
    #[serde(default = "default_top_regions")]
    pub top_regions: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_regions: default_top_regions(),
        }
    }
}

fn default_top_regions() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref datasets) = args.datasets {
            self.source.datasets_path = datasets.display().to_string();
        }
        if args.remote {
            self.source.mode = SourceMode::Remote;
        }
        if let Some(ref base_url) = args.base_url {
            self.source.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.display().to_string();
        }

        // The profile sets all three variants; individual flags refine it.
        if let Some(profile) = args.profile {
            self.analysis = profile.analysis();
        }
        if let Some(typology) = args.typology {
            self.analysis.typology = typology;
        }
        if let Some(lifecycle) = args.lifecycle {
            self.analysis.lifecycle = lifecycle;
        }
        if let Some(imbalance) = args.imbalance {
            self.analysis.imbalance = imbalance;
        }

        if let Some(top) = args.top {
            self.report.top_regions = top;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
