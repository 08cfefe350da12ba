//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use pypi_pulse::package::cache::Cache;
use pypi_pulse::package::clock::FixedClock;
use pypi_pulse::package::error::IndexError;
use pypi_pulse::package::index::PackageIndex;
use pypi_pulse::package::repository::PackageRepository;
use pypi_pulse::package::resolver::Resolver;
use pypi_pulse::package::types::ReleaseRecord;

/// Instant every test resolver believes it is
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Three releases, the middle one yanked, latest on 2021-08-09
pub fn transformers_releases() -> Vec<ReleaseRecord> {
    vec![
        ReleaseRecord::new("v1.2.10", at("2021-08-09T14:27:16"), false),
        ReleaseRecord::new("v1.1.0", at("2021-06-09T14:27:16"), true),
        ReleaseRecord::new("v0.2.0", at("2021-05-09T14:27:16"), false),
    ]
}

/// In-process index answering from a fixed table
#[derive(Default)]
pub struct FakeIndex {
    releases: HashMap<String, Vec<ReleaseRecord>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, name: &str, releases: Vec<ReleaseRecord>) -> Self {
        self.releases.insert(name.to_string(), releases);
        self
    }

    /// Answers `name` with a 503
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Sleeps before answering, to keep a fetch in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Counter of fetches, shared with the index
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl PackageIndex for FakeIndex {
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<ReleaseRecord>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(package_name) {
            return Err(IndexError::UnexpectedStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }

        Ok(self.releases.get(package_name).cloned().unwrap_or_default())
    }
}

/// In-memory cache pre-filled with packages refreshed `age` ago
pub fn create_test_cache(
    packages: &[(&str, Vec<ReleaseRecord>)],
    age: TimeDelta,
) -> Arc<Mutex<Cache>> {
    let mut cache = Cache::in_memory().unwrap();

    for (name, releases) in packages {
        let package = cache.create_package(name, now() - age).unwrap();
        cache.replace_releases(package.id, releases).unwrap();
    }

    Arc::new(Mutex::new(cache))
}

pub fn create_test_resolver(
    index: FakeIndex,
    cache: Arc<Mutex<Cache>>,
) -> Arc<Resolver<FakeIndex, Cache>> {
    Arc::new(
        Resolver::new(index, cache, TimeDelta::hours(24)).with_clock(Arc::new(FixedClock(now()))),
    )
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn htmx_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("hx-request", "true")
        .body(Body::empty())
        .unwrap()
}
