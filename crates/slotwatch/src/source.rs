use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::config::PageSettings;

// The site serves a reduced page to unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("{url} responded with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Failed to read snapshot {path}: {source}")]
    Snapshot { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct LiveFetcher {
    client: Client,
    url: String,
}

impl LiveFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// A single GET; any non-2xx status fails the fetch.
    pub async fn fetch(&self) -> Result<String, SourceError> {
        log::info!("Fetching {}...", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status,
            });
        }

        Ok(response
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

/// Where the availability page comes from: a file pre-rendered by a headless
/// browser, or a direct request to the site.
#[derive(Debug, Clone)]
pub enum PageSource {
    Snapshot(PathBuf),
    Live(LiveFetcher),
}

impl PageSource {
    /// Prefers the snapshot whenever the file exists, without checking its age.
    pub fn select(
        snapshot_file: &Path,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        if snapshot_file.is_file() {
            return Ok(PageSource::Snapshot(snapshot_file.to_path_buf()));
        }
        log::debug!(
            "No snapshot at {}, falling back to a live fetch",
            snapshot_file.display()
        );
        Ok(PageSource::Live(LiveFetcher::new(url, timeout)?))
    }

    pub fn from_settings(page: &PageSettings) -> Result<Self, SourceError> {
        Self::select(&page.snapshot_file, &page.page_url(), page.timeout)
    }

    /// Always fetches, even when a snapshot exists.
    pub fn live(page: &PageSettings) -> Result<Self, SourceError> {
        Ok(PageSource::Live(LiveFetcher::new(
            page.page_url(),
            page.timeout,
        )?))
    }

    pub async fn get_document(&self) -> Result<String, SourceError> {
        match self {
            PageSource::Snapshot(path) => {
                log::info!("Reading snapshot {}", path.display());
                fs::read_to_string(path).map_err(|source| SourceError::Snapshot {
                    path: path.clone(),
                    source,
                })
            }
            PageSource::Live(fetcher) => fetcher.fetch().await,
        }
    }
}

impl Display for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageSource::Snapshot(path) => write!(f, "snapshot {}", path.display()),
            PageSource::Live(fetcher) => write!(f, "live {}", fetcher.url()),
        }
    }
}
