//! PyPI JSON API implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::package::error::IndexError;
use crate::package::index::PackageIndex;
use crate::package::types::ReleaseRecord;

/// Default base URL for the PyPI index
pub const DEFAULT_BASE_URL: &str = "https://pypi.org";

/// Response from the PyPI JSON API, reduced to what we read
#[derive(Debug, Deserialize)]
struct PyPiPackageResponse {
    /// Version -> uploaded artifacts, in index order
    releases: IndexMap<String, Vec<ReleaseFile>>,
}

/// One uploaded artifact (sdist or wheel) of a version
#[derive(Debug, Deserialize)]
struct ReleaseFile {
    upload_time: String,
    #[serde(default)]
    yanked: bool,
}

/// Index implementation for the PyPI JSON API
pub struct PyPiIndex {
    client: reqwest::Client,
    base_url: Url,
}

impl PyPiIndex {
    /// Creates a new PyPiIndex against `base_url`, bounding each request by `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IndexError> {
        let base_url =
            Url::parse(base_url).map_err(|e| IndexError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(IndexError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pypi-pulse/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// `<base>/pypi/<name>/json`, with the name encoded as a single segment
    fn package_url(&self, package_name: &str) -> Result<Url, IndexError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| IndexError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["pypi", package_name, "json"]);
        Ok(url)
    }
}

#[async_trait]
impl PackageIndex for PyPiIndex {
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<ReleaseRecord>, IndexError> {
        let url = self.package_url(package_name)?;

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("PyPI does not know package {}", package_name);
            return Ok(Vec::new());
        }

        if status != reqwest::StatusCode::OK {
            warn!("PyPI returned status {}: {}", status, url);
            return Err(IndexError::UnexpectedStatus(status));
        }

        let package_info: PyPiPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse PyPI response: {}", e);
            IndexError::InvalidResponse(e.to_string())
        })?;

        let mut releases = Vec::with_capacity(package_info.releases.len());
        for (version, files) in package_info.releases {
            // A version may have several artifacts; the first one listed stands for it
            let Some(file) = files.into_iter().next() else {
                debug!("Skipping {} {}: no uploaded files", package_name, version);
                continue;
            };

            let uploaded_at = parse_upload_time(&file.upload_time).ok_or_else(|| {
                warn!(
                    "Invalid upload_time {:?} for {} {}",
                    file.upload_time, package_name, version
                );
                IndexError::InvalidResponse(format!(
                    "invalid upload_time for version {version}: {}",
                    file.upload_time
                ))
            })?;

            releases.push(ReleaseRecord::new(version, uploaded_at, file.yanked));
        }

        Ok(releases)
    }
}

/// Parses an ISO-8601 timestamp into a naive one, converting offsets to UTC
fn parse_upload_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}
