//! JSON API

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::package::error::ResolveError;
use crate::package::index::PackageIndex;
use crate::package::repository::PackageRepository;
use crate::package::resolver::Resolver;
use crate::package::types::{PackageInfo, ResolveOptions};

/// Body of `POST /api/pkg_infos`
#[derive(Debug, Deserialize)]
pub struct PackageParameters {
    pub pkg_name: String,
    /// Skip the local cache and ask the index, slower
    #[serde(default)]
    pub force_refresh: bool,
}

/// Failure of an API request, rendered as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    /// The body is not a valid `PackageParameters` document
    InvalidBody(JsonRejection),
    Resolve(ResolveError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Resolve(ResolveError::UnknownPackage(_)) => (
                StatusCode::NOT_FOUND,
                "This package was not published to PyPi index.".to_string(),
            ),
            ApiError::Resolve(ResolveError::UpstreamUnavailable(_)) => (
                StatusCode::BAD_GATEWAY,
                "The package index could not be reached, try again later.".to_string(),
            ),
            ApiError::Resolve(ResolveError::Cache(e)) => {
                error!("Cache failure while serving API request: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.".to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Last release date (raw), number of versions, number of yanked versions
pub async fn pkg_infos<I, R>(
    State(resolver): State<Arc<Resolver<I, R>>>,
    parameters: Result<Json<PackageParameters>, JsonRejection>,
) -> Result<Json<PackageInfo>, ApiError>
where
    I: PackageIndex + 'static,
    R: PackageRepository + Send + 'static,
{
    let Json(parameters) = parameters?;
    let info = resolver
        .package_info(
            &parameters.pkg_name,
            ResolveOptions {
                force_refresh: parameters.force_refresh,
                human_readable: false,
            },
        )
        .await?;

    Ok(Json(info))
}
