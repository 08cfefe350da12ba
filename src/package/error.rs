use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Failed to create schema: {0}")]
    SchemaCreation(String),

    #[error("Database query failed: {0}")]
    Query(String),

    #[error("Cache lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status from package index: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Invalid response from package index: {0}")]
    InvalidResponse(String),

    #[error("Invalid package index URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Package index unavailable: {0}")]
    UpstreamUnavailable(#[source] IndexError),

    #[error("Package `{0}` was not published to the index")]
    UnknownPackage(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
