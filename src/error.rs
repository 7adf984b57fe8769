use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single network fetch or download.
///
/// These never escape [`crate::PageFetcher::download`]; they are logged and
/// turned into a skipped asset. [`crate::PageFetcher::fetch_text`] returns
/// them so the caller can decide whether the failure is page-level.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} cancelled")]
    Cancelled { url: String },
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed to fetch page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse markup of {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid project name {0:?}")]
    InvalidProjectName(String),

    #[error("project {0:?} is already being mirrored")]
    ProjectBusy(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MirrorError> = std::result::Result<T, E>;
