// File: src/dispatcher.rs
// Purpose: Single per-request entry point - triage into API call, static asset or page view

use crate::assets::{is_static_asset, StaticFiles};
use crate::codec::{pathname, query_params};
use crate::registry::{Handler, RouteRegistry};
use crate::response::{error_body, json_response, ApiReply};
use crate::view::interpolate::escape_html;
use crate::view::ViewResolver;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use chrono::Datelike;
use serde_json::{json, Value as JsonValue};
use std::any::Any;
use std::sync::Arc;

pub const API_NOT_FOUND: &str = "API endpoint not found";

/// How a request will be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Api,
    StaticAsset,
    PageView,
}

/// Routes every inbound request
///
/// Controllers are consulted in the order they were given; within a
/// controller, routes are matched in registration order. The first match
/// handles the request.
pub struct Dispatcher {
    api_root: String,
    site_name: String,
    controllers: Vec<RouteRegistry>,
    views: Arc<ViewResolver>,
    assets: StaticFiles,
}

impl Dispatcher {
    pub fn new(
        api_root: impl Into<String>,
        site_name: impl Into<String>,
        controllers: Vec<RouteRegistry>,
        views: ViewResolver,
        assets: StaticFiles,
    ) -> Self {
        Self {
            api_root: api_root.into(),
            site_name: site_name.into(),
            controllers,
            views: Arc::new(views),
            assets,
        }
    }

    pub fn controllers(&self) -> &[RouteRegistry] {
        &self.controllers
    }

    pub fn classify(&self, pathname: &str) -> RequestKind {
        if pathname.starts_with(&self.api_root) {
            RequestKind::Api
        } else if is_static_asset(pathname) {
            RequestKind::StaticAsset
        } else {
            RequestKind::PageView
        }
    }

    /// First handler registered for `(pathname, method)` across all controllers
    pub fn find_handler(&self, pathname: &str, method: &str) -> Option<(&str, Arc<dyn Handler>)> {
        self.controllers.iter().find_map(|controller| {
            controller
                .lookup(pathname, method)
                .map(|handler| (controller.name(), handler))
        })
    }

    pub async fn on_request(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let raw_path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();
        let path = pathname(&raw_path).to_string();
        let method = parts.method.as_str();

        match self.classify(&path) {
            RequestKind::Api => {
                self.dispatch_api(&raw_path, &path, method, body, parts.headers)
                    .await
            }
            RequestKind::StaticAsset => self.assets.serve(&path).await,
            RequestKind::PageView => {
                let route_key = path.trim_start_matches('/').to_string();
                let base_data = self.base_data(&path);
                Arc::clone(&self.views)
                    .render(route_key, base_data, raw_path)
                    .await
            }
        }
    }

    async fn dispatch_api(
        &self,
        raw_path: &str,
        path: &str,
        method: &str,
        body: Body,
        headers: HeaderMap,
    ) -> Response {
        let Some((controller, handler)) = self.find_handler(path, method) else {
            tracing::debug!(path, method, "No API route matched");
            return json_response(StatusCode::NOT_FOUND, &error_body(API_NOT_FOUND));
        };

        let query = query_params(raw_path);
        let task = tokio::spawn(handler.handle(query, body, headers));

        let outcome = match task.await {
            Ok(result) => result.map_err(|e| format!("{e:#}")),
            Err(join_error) if join_error.is_panic() => {
                Err(panic_message(join_error.into_panic()))
            }
            Err(join_error) => Err(join_error.to_string()),
        };

        match outcome {
            Ok(ApiReply { status, body }) => {
                tracing::debug!(controller, path, method, status = status.as_u16(), "API request handled");
                json_response(status, &body)
            }
            Err(message) => {
                tracing::error!(controller, path, method, error = %message, "API handler failed");
                json_response(StatusCode::INTERNAL_SERVER_ERROR, &error_body(message))
            }
        }
    }

    /// Data every page can interpolate; the request path is HTML-escaped
    pub fn base_data(&self, pathname: &str) -> JsonValue {
        json!({
            "site": { "name": self.site_name },
            "path": escape_html(pathname),
            "year": chrono::Utc::now().year(),
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Handler panicked".to_string()
    }
}

/// Axum fallback that hands every request to the dispatcher
pub async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, req: Request) -> Response {
    dispatcher.on_request(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::QueryParams;
    use crate::view::PageTree;
    use tempfile::TempDir;

    fn dispatcher(root: &TempDir, controllers: Vec<RouteRegistry>) -> Dispatcher {
        Dispatcher::new(
            "/api",
            "Ballot",
            controllers,
            ViewResolver::new(PageTree::new(root.path().join("pages"), root.path(), ':'), false),
            StaticFiles::new(root.path().join("public"), false),
        )
    }

    fn echo(name: &'static str) -> impl Handler {
        move |_query: QueryParams, _body: Body, _headers: HeaderMap| async move {
            Ok::<_, anyhow::Error>(ApiReply::ok(json!({ "from": name })))
        }
    }

    #[test]
    fn test_classify() {
        let root = TempDir::new().unwrap();
        let d = dispatcher(&root, Vec::new());
        assert_eq!(d.classify("/api/polls"), RequestKind::Api);
        assert_eq!(d.classify("/css/site.css"), RequestKind::StaticAsset);
        assert_eq!(d.classify("/poll/1"), RequestKind::PageView);
        assert_eq!(d.classify("/"), RequestKind::PageView);
    }

    #[test]
    fn test_first_controller_wins() {
        let root = TempDir::new().unwrap();
        let mut first = RouteRegistry::new("first", "/api", "/shared");
        first.register("/x", "GET", echo("first"));
        let mut second = RouteRegistry::new("second", "/api", "/shared");
        second.register("/x", "GET", echo("second"));
        second.register("/y", "GET", echo("second"));

        let d = dispatcher(&root, vec![first, second]);
        assert_eq!(d.find_handler("/api/shared/x", "GET").map(|(n, _)| n), Some("first"));
        assert_eq!(d.find_handler("/api/shared/y", "get").map(|(n, _)| n), Some("second"));
        assert!(d.find_handler("/api/shared/z", "GET").is_none());
    }

    #[test]
    fn test_base_data() {
        let root = TempDir::new().unwrap();
        let data = dispatcher(&root, Vec::new()).base_data("/about");
        assert_eq!(data["site"]["name"], "Ballot");
        assert_eq!(data["path"], "/about");
        assert!(data["year"].as_i64().unwrap() >= 2024);
    }

    #[test]
    fn test_base_data_escapes_path() {
        let root = TempDir::new().unwrap();
        let data = dispatcher(&root, Vec::new()).base_data("/it's/\"x\"");
        assert_eq!(data["path"], "/it&#39;s/&quot;x&quot;");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("boom".to_string())), "boom");
        assert_eq!(panic_message(Box::new(7)), "Handler panicked");
    }
}
