// File: src/assets.rs
// Purpose: Static file serving from the public directory

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Extensions served as static assets; everything else is a page view
pub const STATIC_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "map", "json", "txt", "xml", "webmanifest", "png", "jpg", "jpeg", "gif",
    "svg", "ico", "webp", "avif", "woff", "woff2", "ttf", "otf",
];

const DEV_CACHE_CONTROL: &str = "no-cache";
const PROD_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Whether the pathname's extension marks it as a static asset
pub fn is_static_asset(pathname: &str) -> bool {
    let file_name = pathname.rsplit('/').next().unwrap_or("");
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| STATIC_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Join a URL path under `root`, refusing anything that could escape it
pub fn safe_join(root: &Path, pathname: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    let mut depth = 0;
    for segment in pathname.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\\') || segment.contains('\0') {
            return None;
        }
        joined.push(segment);
        depth += 1;
    }
    (depth > 0).then_some(joined)
}

/// MIME type for a file, with an explicit charset for text types
pub fn content_type_for(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let essence = mime.essence_str();
    if mime.type_() == mime_guess::mime::TEXT
        || essence == "application/javascript"
        || essence == "application/json"
    {
        format!("{essence}; charset=utf-8")
    } else {
        essence.to_string()
    }
}

/// Serves files from the public directory
#[derive(Debug, Clone)]
pub struct StaticFiles {
    public_dir: PathBuf,
    development: bool,
}

impl StaticFiles {
    pub fn new(public_dir: impl Into<PathBuf>, development: bool) -> Self {
        Self {
            public_dir: public_dir.into(),
            development,
        }
    }

    fn cache_control(&self) -> &'static str {
        if self.development {
            DEV_CACHE_CONTROL
        } else {
            PROD_CACHE_CONTROL
        }
    }

    /// Serve `pathname` from disk; a missing file is a 404, never a 500
    pub async fn serve(&self, pathname: &str) -> Response {
        let Some(path) = safe_join(&self.public_dir, pathname).filter(|p| !p.is_dir()) else {
            return not_found();
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type_for(&path)),
                    (header::CACHE_CONTROL, self.cache_control().to_string()),
                ],
                bytes,
            )
                .into_response(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(pathname, "Static asset not found");
                not_found()
            }
            Err(e) => {
                tracing::error!(pathname, error = %e, "Failed to read static asset");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
        .into_response()
}
