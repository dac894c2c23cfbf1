// ciroh_sources - Dashboard data sources for drought and water prediction services
//
// Copyright 2024 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! HTTP routes for listing, describing, and reading data sources.

use crate::source::{Context, Params, SourceInfo, SourceKind};
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const OPEN_METRICS_TEXT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by every request handler.
#[derive(Debug)]
pub struct RequestContext {
    sources: Context,
    registry: Registry,
}

impl RequestContext {
    pub fn new(sources: Context, registry: Registry) -> Self {
        RequestContext { sources, registry }
    }
}

/// Build the router serving every data source and metrics about them.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/sources", get(list_sources))
        .route("/sources/:name", get(read_source))
        .route("/sources/:name/args", get(source_args))
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn list_sources() -> Json<Vec<SourceInfo>> {
    Json(SourceKind::ALL.iter().map(|k| k.info()).collect())
}

async fn source_args(State(context): State<Arc<RequestContext>>, Path(name): Path<String>) -> Response {
    let kind = match SourceKind::from_name(&name) {
        Some(k) => k,
        None => return unknown_source(&name),
    };

    let today = chrono::Local::now().date_naive();
    Json(kind.args(&context.sources, today).await).into_response()
}

async fn read_source(
    State(context): State<Arc<RequestContext>>,
    Path(name): Path<String>,
    Query(values): Query<HashMap<String, String>>,
) -> Response {
    let kind = match SourceKind::from_name(&name) {
        Some(k) => k,
        None => return unknown_source(&name),
    };

    let source = match kind.build(&context.sources, &Params::new(&values)) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(message = "invalid source arguments", source = %name, error = %e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let info = kind.info();
    context.sources.client.metrics().read(info.name);
    Json(source.read().await).into_response()
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();
    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPEN_METRICS_TEXT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

fn unknown_source(name: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("unknown source '{}'", name))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::{router, RequestContext};
    use crate::cache::DateCache;
    use crate::client::{ApiClient, Endpoints};
    use crate::metrics::UpstreamMetrics;
    use crate::source::{Context, SourceKind};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use prometheus_client::registry::Registry;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router(dir: &std::path::Path) -> Router {
        let mut registry = Registry::default();
        let metrics = UpstreamMetrics::new(&mut registry);
        let client = ApiClient::new(reqwest::Client::new(), metrics);
        let sources = Context::new(client, Endpoints::default(), DateCache::new(dir));
        router(Arc::new(RequestContext::new(sources, registry)))
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_list_sources() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_router(dir.path()), Method::GET, "/sources").await;
        let sources: Vec<Value> = serde_json::from_slice(&body).unwrap();

        assert_eq!(StatusCode::OK, status);
        assert_eq!(SourceKind::ALL.len(), sources.len());
        assert_eq!(json!("drought_map"), sources[0]["name"]);
        assert_eq!(json!("map"), sources[0]["type"]);
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_router(dir.path()), Method::GET, "/sources/nope?id=1").await;
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(StatusCode::NOT_FOUND, status);
        assert_eq!(json!("unknown source 'nope'"), body["error"]);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_router(dir.path()), Method::GET, "/sources/huc_boundary_map?huc=123").await;
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert!(body["error"].as_str().unwrap().contains("'huc'"));
    }

    #[tokio::test]
    async fn test_missing_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(test_router(dir.path()), Method::GET, "/sources/nwmp_api_gauges").await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
    }

    #[tokio::test]
    async fn test_text_args_without_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_router(dir.path()), Method::GET, "/sources/nwmp_api_reaches/args").await;
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(StatusCode::OK, status);
        assert_eq!(json!({"id": "text"}), body);
    }

    #[tokio::test]
    async fn test_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(test_router(dir.path()), Method::GET, "/metrics").await;
        let body = String::from_utf8(body).unwrap();

        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("ciroh_upstream_requests"));
        assert!(body.ends_with("# EOF\n"));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(test_router(dir.path()), Method::POST, "/metrics").await;
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, status);
    }
}
