// File: src/view/mod.rs
// Purpose: Page rendering - template resolution, interpolation and layout composition

pub mod interpolate;
pub mod resolve;

use crate::codec::query_params;
use crate::config::Config;
use crate::response::html_response;
use axum::response::Response;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub use interpolate::{compose, interpolate};
pub use resolve::{PageTree, Resolution, TemplateSource};

/// Served when neither a page nor a 404 template exists
pub const INLINE_NOT_FOUND: &str = "<h1>404 - Page Not Found</h1>";
/// Served when a resolved template cannot be read
pub const TEMPLATE_READ_FAILED: &str = "<h1>Template not found</h1>";

const LAYOUT_FILE: &str = "layout.html";

/// Template content plus the dynamic segments that selected it
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTemplate {
    pub content: String,
    pub params: HashMap<String, String>,
}

impl LoadedTemplate {
    fn placeholder(content: &str) -> Self {
        Self {
            content: content.to_string(),
            params: HashMap::new(),
        }
    }
}

/// Resolves template keys to pages and renders them into the layout
///
/// Outside development mode the layout and every template file are read
/// once and kept in memory; in development mode both are read from disk on
/// every render.
pub struct ViewResolver {
    tree: PageTree,
    development: bool,
    layout: OnceCell<String>,
    templates: RwLock<HashMap<PathBuf, String>>,
}

impl ViewResolver {
    pub fn new(tree: PageTree, development: bool) -> Self {
        Self {
            tree,
            development,
            layout: OnceCell::new(),
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let tree = PageTree::new(
            config.pages_dir(),
            config.app_dir(),
            config.routing.dynamic_marker,
        );
        Self::new(tree, config.is_development())
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn resolve_template_path(&self, route_key: &str) -> Resolution {
        self.tree.resolve(route_key)
    }

    /// Resolve and read a template; never fails
    pub fn load_template(&self, route_key: &str) -> LoadedTemplate {
        let resolution = self.resolve_template_path(route_key);
        if resolution.is_not_found_page(&self.tree) {
            tracing::debug!(route_key, "No page matched, rendering 404 content");
        }

        let path = match resolution.source {
            TemplateSource::InlineNotFound => {
                tracing::debug!(route_key, "No page or 404 template, using inline placeholder");
                return LoadedTemplate::placeholder(INLINE_NOT_FOUND);
            }
            TemplateSource::File(path) => path,
        };

        match self.read_template(&path) {
            Some(content) => LoadedTemplate {
                content,
                params: resolution.params,
            },
            None => LoadedTemplate::placeholder(TEMPLATE_READ_FAILED),
        }
    }

    fn read_template(&self, path: &Path) -> Option<String> {
        if !self.development {
            let cached = self
                .templates
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(path)
                .cloned();
            if cached.is_some() {
                return cached;
            }
        }

        match fs::read_to_string(path) {
            Ok(content) => {
                if !self.development {
                    self.templates
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(path.to_path_buf(), content.clone());
                }
                Some(content)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read template");
                None
            }
        }
    }

    /// The layout shell; a bare `{{content}}` when the file is unreadable
    pub fn layout(&self) -> String {
        if self.development {
            return self.read_layout();
        }
        self.layout.get_or_init(|| self.read_layout()).clone()
    }

    fn read_layout(&self) -> String {
        let path = self.tree.app_dir().join(LAYOUT_FILE);
        fs::read_to_string(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Layout unavailable, rendering bare content");
            interpolate::CONTENT_MARKER.to_string()
        })
    }

    /// Build the full HTML for a page view
    ///
    /// The data context is `base_data`, overlaid by the dynamic segments and
    /// then by the query string of `request_path`. Request-derived values are
    /// HTML-escaped on the way in.
    pub fn render_page(&self, route_key: &str, base_data: &JsonValue, request_path: &str) -> String {
        let template = self.load_template(route_key);

        let mut context: Map<String, JsonValue> = match base_data {
            JsonValue::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let request_values = template
            .params
            .into_iter()
            .chain(query_params(request_path).into_inner());
        for (key, value) in request_values {
            context.insert(key, JsonValue::String(interpolate::escape_html(&value)));
        }

        let content = interpolate(&template.content, &JsonValue::Object(context));
        compose(&self.layout(), &content)
    }

    /// Render a page view into its final response
    ///
    /// Filesystem work runs on the blocking pool. The response is always a
    /// 200 HTML page, including for not-found content.
    pub async fn render(self: Arc<Self>, route_key: String, base_data: JsonValue, request_path: String) -> Response {
        let html = tokio::task::spawn_blocking(move || {
            self.render_page(&route_key, &base_data, &request_path)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Page render task failed");
            TEMPLATE_READ_FAILED.to_string()
        });

        html_response(html)
    }
}
