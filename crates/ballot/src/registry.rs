// File: src/registry.rs
// Purpose: Per-controller table of (path, method, handler) routes with exact-match lookup

use crate::codec::QueryParams;
use crate::response::ApiReply;
use axum::body::Body;
use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by every API handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<ApiReply>> + Send>>;

/// Capability shared by every API endpoint
///
/// Receives the decoded query string, the raw request body and the request
/// headers. Any async closure with that shape is a handler.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, query: QueryParams, body: Body, headers: HeaderMap) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(QueryParams, Body, HeaderMap) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ApiReply>> + Send + 'static,
{
    fn handle(&self, query: QueryParams, body: Body, headers: HeaderMap) -> HandlerFuture {
        Box::pin(self(query, body, headers))
    }
}

/// One registered endpoint
#[derive(Clone)]
pub struct Route {
    /// Absolute path including the API root and controller base path
    pub path: String,
    /// Upper-cased HTTP method
    pub method: String,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl Route {
    fn matches(&self, path: &str, method: &str) -> bool {
        self.path == path && self.method == method
    }
}

/// Routes owned by one controller
///
/// Lookup is a linear scan in registration order; the first route whose
/// path and method both match wins.
pub struct RouteRegistry {
    name: String,
    api_root: String,
    base_path: String,
    routes: Vec<Route>,
}

impl RouteRegistry {
    pub fn new(
        name: impl Into<String>,
        api_root: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_root: api_root.into(),
            base_path: base_path.into(),
            routes: Vec::new(),
        }
    }

    /// Register a handler under `{api_root}{base_path}{relative_path}`
    ///
    /// Never fails: a malformed path simply never matches.
    pub fn register(&mut self, relative_path: &str, method: &str, handler: impl Handler) {
        let path = collapse_slashes(&format!(
            "{}{}{}",
            self.api_root, self.base_path, relative_path
        ));
        tracing::debug!(controller = %self.name, %path, method, "Registered route");

        self.routes.push(Route {
            path,
            method: method.to_uppercase(),
            handler: Arc::new(handler),
        });
    }

    /// Find the handler for an exact path and a case-insensitive method
    pub fn lookup(&self, path: &str, method: &str) -> Option<Arc<dyn Handler>> {
        let method = method.to_uppercase();
        self.routes
            .iter()
            .find(|route| route.matches(path, &method))
            .map(|route| Arc::clone(&route.handler))
    }

    /// Snapshot of all registered routes
    pub fn list(&self) -> Vec<Route> {
        self.routes.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("routes", &self.routes)
            .finish()
    }
}

/// Collapse runs of `/` into one (Pure function)
pub fn collapse_slashes(path: &str) -> String {
    static SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/{2,}").unwrap());
    SLASHES.replace_all(path, "/").into_owned()
}
