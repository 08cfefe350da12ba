use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::package::index::PackageIndex;
use crate::package::repository::PackageRepository;
use crate::package::resolver::Resolver;
use crate::server::{api, pages};

/// HTML pages at the root, JSON API under `/api`
pub fn router<I, R>(resolver: Arc<Resolver<I, R>>) -> Router
where
    I: PackageIndex + 'static,
    R: PackageRepository + Send + 'static,
{
    Router::new()
        .route("/", get(pages::home))
        .route("/search", get(pages::search::<I, R>))
        .route("/api/pkg_infos", post(api::pkg_infos::<I, R>))
        .fallback(pages::not_found)
        .with_state(resolver)
}
