//! Load failure taxonomy.
//!
//! A `LoadError` always describes one source unit (a file or a URL).
//! Callers log it and move on to the next unit; it never aborts a load.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed CSV in {unit}: {source}")]
    Csv {
        unit: String,
        #[source]
        source: csv::Error,
    },

    #[error("dataset directory not found: {0}")]
    MissingDirectory(PathBuf),
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;
