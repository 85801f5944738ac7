// File: src/controllers/health.rs
// Purpose: Liveness endpoint

use super::ControllerContext;
use crate::codec::QueryParams;
use crate::registry::RouteRegistry;
use crate::response::ApiReply;
use axum::body::Body;
use axum::http::HeaderMap;
use serde_json::json;

pub fn controller(ctx: &ControllerContext) -> RouteRegistry {
    let mut registry = RouteRegistry::new("health", &ctx.api_root, "/health");

    registry.register("", "GET", |_query: QueryParams, _body: Body, _headers: HeaderMap| async {
        Ok::<_, anyhow::Error>(ApiReply::ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })))
    });

    registry
}
