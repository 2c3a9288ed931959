//! HTTP request handling
//!
//! Every path is a node lookup, so the router only has a root route and a
//! catch-all:
//!
//! - `GET /<path>` returns the full node description
//! - `GET /<path>?<ATTR>` returns `{ATTR: value}`
//! - `GET /<any>?HOST_INFO` returns the host info document

use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::any,
    Router,
};
use oscquery_core::Attribute;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::server::Shared;

pub(crate) fn router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/", any(handle_root))
        .route("/*path", any(handle_path))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn handle_root(
    State(shared): State<Arc<Shared>>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Response {
    respond(&shared, &method, "/", query.as_deref())
}

async fn handle_path(
    State(shared): State<Arc<Shared>>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    respond(&shared, &method, &path, query.as_deref())
}

fn respond(shared: &Shared, method: &Method, path: &str, query: Option<&str>) -> Response {
    shared.note_request(path);

    if method != Method::GET {
        debug!("Rejecting {} {}", method, path);
        return StatusCode::BAD_REQUEST.into_response();
    }

    let attribute = match parse_query(query) {
        Ok(attribute) => attribute,
        Err(raw) => {
            debug!("Rejecting unknown attribute {:?} on {}", raw, path);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if attribute == Some(Attribute::HostInfo) {
        return Json(&shared.host_info).into_response();
    }

    let tree = shared.tree.read();
    let Some(node) = tree.resolve(path) else {
        debug!("No node at {}", path);
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(description) = node.describe() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match attribute {
        None => Json(description).into_response(),
        Some(Attribute::Value) if !node.access().unwrap_or_default().is_readable() => {
            StatusCode::NO_CONTENT.into_response()
        }
        Some(attribute) => Json(description.attribute(attribute)).into_response(),
    }
}

/// At most one query parameter, named by an OSCQuery attribute
fn parse_query(query: Option<&str>) -> std::result::Result<Option<Attribute>, String> {
    let mut params = query
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty());

    let Some(param) = params.next() else {
        return Ok(None);
    };
    if params.next().is_some() {
        return Err(query.unwrap_or_default().to_string());
    }

    let name = param.split('=').next().unwrap_or(param);
    name.parse::<Attribute>()
        .map(Some)
        .map_err(|_| name.to_string())
}
