//! Where workbook bytes come from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::LoadError;

/// Location of a workbook asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookSource {
    /// `http://` or `https://` URL.
    Url(String),
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl WorkbookSource {
    /// Interpret a user-supplied location: URLs by scheme, anything else as a path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if let Some(path) = trimmed.strip_prefix("file://") {
            return WorkbookSource::Path(PathBuf::from(path));
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            WorkbookSource::Url(trimmed.to_string())
        } else {
            WorkbookSource::Path(PathBuf::from(trimmed))
        }
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        WorkbookSource::Path(path.as_ref().to_path_buf())
    }

    /// Read the whole asset.
    pub async fn fetch(&self, options: &FetchOptions) -> Result<Vec<u8>, LoadError> {
        match self {
            WorkbookSource::Bytes(bytes) => Ok(bytes.clone()),
            WorkbookSource::Path(path) => {
                debug!(path = %path.display(), "reading workbook file");
                tokio::fs::read(path).await.map_err(|source| LoadError::File {
                    path: path.display().to_string(),
                    source,
                })
            }
            WorkbookSource::Url(url) => fetch_url(url, options).await,
        }
    }
}

impl fmt::Display for WorkbookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkbookSource::Url(url) => f.write_str(url),
            WorkbookSource::Path(path) => write!(f, "{}", path.display()),
            WorkbookSource::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for WorkbookSource {
    fn from(bytes: Vec<u8>) -> Self {
        WorkbookSource::Bytes(bytes)
    }
}

impl From<PathBuf> for WorkbookSource {
    fn from(path: PathBuf) -> Self {
        WorkbookSource::Path(path)
    }
}

impl From<&str> for WorkbookSource {
    fn from(location: &str) -> Self {
        WorkbookSource::parse(location)
    }
}

/// HTTP settings for [`WorkbookSource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("roicalc/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

async fn fetch_url(url: &str, options: &FetchOptions) -> Result<Vec<u8>, LoadError> {
    let fetch_err = |e: reqwest::Error| LoadError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    };
    let client = reqwest::Client::builder()
        .timeout(options.timeout)
        .user_agent(options.user_agent.clone())
        .build()
        .map_err(fetch_err)?;

    debug!(%url, "fetching workbook");
    let response = client.get(url).send().await.map_err(fetch_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(fetch_err)?;
    Ok(bytes.to_vec())
}
