use std::path::PathBuf;
use thiserror::Error;

/// Failures that cross an operation boundary.
///
/// Only session start-up is fatal to callers; everything raised while a page
/// is being driven is absorbed by the flow that detects it and reported as an
/// absent result instead.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("no Chromium-family browser found; install Chrome or Chromium, or set CHROME_EXECUTABLE")]
    BrowserNotFound,

    #[error("browser config error: {0}")]
    BrowserConfig(String),

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("browser session setup failed: {0}")]
    SessionSetup(String),

    #[error("failed to write {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScraperError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScraperError::Storage {
            path: path.into(),
            source,
        }
    }
}
