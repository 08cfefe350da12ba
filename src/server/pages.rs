//! Server-rendered HTML: the home page and htmx search fragments

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

use crate::package::error::ResolveError;
use crate::package::index::PackageIndex;
use crate::package::repository::PackageRepository;
use crate::package::resolver::Resolver;
use crate::package::types::{PackageInfo, ResolveOptions};

const HTMX_SCRIPT: &str = "https://unpkg.com/htmx.org@1.9.12";

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub pkg: Option<String>,
}

pub async fn home() -> Html<String> {
    Html(page(
        "pypi-pulse",
        r##"<h1>pypi-pulse</h1>
<form hx-get="/search" hx-target="#result">
  <input type="search" name="pkg" placeholder="Package name" required>
  <button type="submit">Search</button>
</form>
<div id="result"></div>"##,
    ))
}

/// Search result fragment, only served to htmx requests
pub async fn search<I, R>(
    State(resolver): State<Arc<Resolver<I, R>>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response
where
    I: PackageIndex + 'static,
    R: PackageRepository + Send + 'static,
{
    if !is_htmx(&headers) {
        return not_found().await.into_response();
    }

    let Some(pkg) = params.pkg else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html("<p class=\"error\">Missing query parameter <code>pkg</code>.</p>".to_string()),
        )
            .into_response();
    };

    let options = ResolveOptions {
        force_refresh: false,
        human_readable: true,
    };

    match resolver.package_info(&pkg, options).await {
        Ok(info) => Html(search_result(&pkg, &info)).into_response(),
        Err(ResolveError::UnknownPackage(_)) => Html(format!(
            "<p class=\"unknown\"><strong>{}</strong> does not exist.</p>",
            escape(&pkg)
        ))
        .into_response(),
        Err(ResolveError::UpstreamUnavailable(_)) => (
            StatusCode::BAD_GATEWAY,
            Html("<p class=\"error\">PyPi could not be reached, try again later.</p>".to_string()),
        )
            .into_response(),
        Err(ResolveError::Cache(e)) => {
            error!("Cache failure while searching {}: {}", pkg, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<p class=\"error\">Something went wrong.</p>".to_string()),
            )
                .into_response()
        }
    }
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(page(
            "Error 404",
            "<h1>Error 404</h1>\n<p>This page does not exist. <a href=\"/\">Back home</a></p>",
        )),
    )
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

fn search_result(pkg: &str, info: &PackageInfo) -> String {
    format!(
        r#"<section class="result">
<h2>{name}</h2>
<dl>
  <dt>Last release</dt><dd>{last_release}</dd>
  <dt>Versions released</dt><dd>{n_versions}</dd>
  <dt>Versions yanked</dt><dd>{n_versions_yanked}</dd>
</dl>
</section>"#,
        name = escape(pkg),
        last_release = escape(&info.last_release.to_string()),
        n_versions = info.n_versions,
        n_versions_yanked = info.n_versions_yanked,
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{htmx}"></script>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
        htmx = HTMX_SCRIPT,
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
