//! Error types shared across the conversion pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Input directory not found: {0}")]
    InputDirNotFound(PathBuf),

    #[error("No Markdown or HTML files in {0}")]
    NoNotesFound(PathBuf),

    #[error("Markup conversion failed: {0}")]
    Markup(String),

    #[error("Download of {url} exceeds max size ({size} bytes)")]
    DownloadTooLarge { url: String, size: u64 },

    #[error("Failed to download {url} after {attempts} attempts")]
    DownloadFailed { url: String, attempts: u32 },

    #[error("Failed to write package {path}: {source}")]
    PackageWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConvertError>;
