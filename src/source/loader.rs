//! Dataset discovery and loading.
//!
//! Local mode reads every `*.csv` file under the per-kind dataset folders;
//! remote mode fetches a configured list of files over HTTP. A source unit
//! that cannot be read or decoded is logged and skipped, so a load never
//! fails as a whole: if every unit fails the store is simply empty.

use crate::config::{SourceConfig, SourceMode};
use crate::error::{LoadError, LoadResult};
use crate::models::EventKind;
use crate::source::records::{parse_csv, RecordBatch};
use crate::source::RecordStore;
use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Settings for dataset loading.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub mode: SourceMode,
    pub datasets_path: PathBuf,
    pub base_url: String,
    pub enrolment_files: Vec<String>,
    pub demographic_files: Vec<String>,
    pub biometric_files: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for SourceSettings {
    fn from(config: &SourceConfig) -> Self {
        Self {
            mode: config.mode,
            datasets_path: PathBuf::from(&config.datasets_path),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enrolment_files: config.enrolment_files.clone(),
            demographic_files: config.demographic_files.clone(),
            biometric_files: config.biometric_files.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

impl SourceSettings {
    fn remote_files(&self, kind: EventKind) -> &[String] {
        match kind {
            EventKind::Enrolment => &self.enrolment_files,
            EventKind::Demographic => &self.demographic_files,
            EventKind::Biometric => &self.biometric_files,
        }
    }
}

/// Where a source unit lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitLocation {
    File(PathBuf),
    Url(String),
}

/// One loadable file or URL of a given kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub kind: EventKind,
    pub location: UnitLocation,
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            UnitLocation::File(path) => write!(f, "[{}] {}", self.kind, path.display()),
            UnitLocation::Url(url) => write!(f, "[{}] {}", self.kind, url),
        }
    }
}

/// Loader for the three raw transaction collections.
pub struct DatasetLoader {
    settings: SourceSettings,
    show_progress: bool,
}

impl DatasetLoader {
    /// Create a new loader.
    pub fn new(settings: SourceSettings, show_progress: bool) -> Self {
        Self {
            settings,
            show_progress,
        }
    }

    /// List the source units a load would read, without reading them.
    pub fn plan(&self) -> Vec<SourceUnit> {
        match self.settings.mode {
            SourceMode::Local => self.local_units(),
            SourceMode::Remote => self.remote_units(),
        }
    }

    /// Load every source unit into a record store.
    ///
    /// Only failing to set up the HTTP client is an error; individual
    /// units are skipped on failure.
    pub async fn load(&self) -> Result<RecordStore> {
        let units = self.plan();
        info!(
            "Loading {} source units ({:?} mode)",
            units.len(),
            self.settings.mode
        );

        let store = match self.settings.mode {
            SourceMode::Local => self.load_local(&units),
            SourceMode::Remote => self.load_remote(&units).await?,
        };

        for kind in EventKind::ALL {
            info!("Loaded {} {} records", store.len(kind), kind);
        }

        Ok(store)
    }

    /// CSV files directly under each kind's dataset folder, sorted by name.
    fn local_units(&self) -> Vec<SourceUnit> {
        let mut units = Vec::new();

        for kind in EventKind::ALL {
            let dir = self.settings.datasets_path.join(kind.folder());
            match csv_files_in(&dir) {
                Ok(files) => units.extend(files.into_iter().map(|path| SourceUnit {
                    kind,
                    location: UnitLocation::File(path),
                })),
                Err(e) => warn!("{}", e),
            }
        }

        units
    }

    fn remote_units(&self) -> Vec<SourceUnit> {
        EventKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.settings
                    .remote_files(kind)
                    .iter()
                    .map(move |file| SourceUnit {
                        kind,
                        location: UnitLocation::Url(format!(
                            "{}/{}/{}",
                            self.settings.base_url,
                            kind.folder(),
                            file
                        )),
                    })
            })
            .collect()
    }

    fn load_local(&self, units: &[SourceUnit]) -> RecordStore {
        let mut store = RecordStore::default();

        for unit in units {
            let UnitLocation::File(ref path) = unit.location else {
                continue;
            };
            absorb(&mut store, unit, read_file(path, unit.kind));
        }

        store
    }

    async fn load_remote(&self, units: &[SourceUnit]) -> Result<RecordStore> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(units.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let fetches = units.iter().map(|unit| {
            let client = &client;
            let pb = progress_bar.as_ref();
            async move {
                let result = match &unit.location {
                    UnitLocation::Url(url) => fetch_url(client, url, unit.kind).await,
                    UnitLocation::File(path) => read_file(path, unit.kind),
                };
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                (unit, result)
            }
        });

        let mut store = RecordStore::default();
        for (unit, result) in join_all(fetches).await {
            absorb(&mut store, unit, result);
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("done");
        }

        Ok(store)
    }
}

/// Add one unit's rows to the store, or skip the unit on failure.
fn absorb(store: &mut RecordStore, unit: &SourceUnit, result: LoadResult<RecordBatch>) {
    match result {
        Ok(batch) if batch.is_empty() => warn!("{} has no usable rows", unit),
        Ok(batch) => {
            debug!("{}: {} rows", unit, batch.len());
            store.extend(batch);
        }
        Err(e) => warn!("Skipping {}: {}", unit, e),
    }
}

/// CSV files directly inside `dir`, sorted by file name.
fn csv_files_in(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LoadError::MissingDirectory(dir.to_path_buf()));
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Cannot read entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("csv"))
        .collect();

    Ok(files)
}

fn read_file(path: &Path, kind: EventKind) -> LoadResult<RecordBatch> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, kind, &path.display().to_string())
}

async fn fetch_url(client: &reqwest::Client, url: &str, kind: EventKind) -> LoadResult<RecordBatch> {
    debug!("Fetching {}", url);
    let http_err = |source| LoadError::Http {
        url: url.to_string(),
        source,
    };

    let body = client
        .get(url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(http_err)?
        .text()
        .await
        .map_err(http_err)?;

    parse_csv(body.as_bytes(), kind, url)
}
