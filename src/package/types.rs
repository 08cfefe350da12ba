//! Common types for package release data

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// One release as reported by the package index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub version: String,
    /// Upload time of the first artifact listed for this version
    pub uploaded_at: NaiveDateTime,
    pub yanked: bool,
}

impl ReleaseRecord {
    pub fn new(version: impl Into<String>, uploaded_at: NaiveDateTime, yanked: bool) -> Self {
        Self {
            version: version.into(),
            uploaded_at,
            yanked,
        }
    }
}

/// A package row of the local cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: i64,
    pub name: String,
    /// When the releases of this package were last fetched from the index
    pub last_updated: DateTime<Utc>,
}

/// A release row of the local cache, owned by one [`Package`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: i64,
    pub package_id: i64,
    pub version: String,
    pub released_at: NaiveDateTime,
    pub yanked: bool,
}

/// Raw statistics computed from the cached release set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseStats {
    pub last_release: NaiveDateTime,
    pub n_versions: u64,
    pub n_versions_yanked: u64,
}

/// Date of the latest release, either formatted for humans or as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LastRelease {
    Humanized(String),
    At(NaiveDateTime),
}

impl std::fmt::Display for LastRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastRelease::Humanized(text) => f.write_str(text),
            LastRelease::At(at) => write!(f, "{}", at.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// Statistics handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub last_release: LastRelease,
    pub n_versions: u64,
    pub n_versions_yanked: u64,
}

/// Per-call options of [`Resolver::package_info`](crate::package::resolver::Resolver::package_info)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Ignore the cache age and always ask the index
    pub force_refresh: bool,
    /// Format `last_release` relative to now instead of returning the timestamp
    pub human_readable: bool,
}
