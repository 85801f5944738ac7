//! File-system page routing.
//!
//! Maps a template key such as `poll/42/results` onto an `.html` file under
//! the pages root:
//!
//! - `home.html` / `home/index.html` for the empty key, `index` and `home`
//! - exact match: `{segments}/index.html`, then `{segments}.html`
//! - dynamic match: a walk over directory listings where a name starting
//!   with the dynamic marker (default `:`) matches any one URL segment and
//!   binds it, e.g. `poll/:id/index.html` matches `poll/42` with `id = 42`
//! - otherwise `404.html` / `404/index.html` under the app root, or an
//!   inline placeholder when neither exists
//!
//! Literal names always beat dynamic ones at the same depth. Once a literal
//! name matches, the walk commits to it: a dead end further down is a miss,
//! not a reason to retry a dynamic sibling.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const TEMPLATE_EXT: &str = ".html";
const INDEX_FILE: &str = "index.html";

/// Where the content for a template key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    /// Nothing matched and no 404 page exists
    InlineNotFound,
}

/// Outcome of resolving a template key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub source: TemplateSource,
    /// Dynamic segment bindings, marker stripped from the name
    pub params: HashMap<String, String>,
}

impl Resolution {
    fn file(path: PathBuf, params: HashMap<String, String>) -> Self {
        Self {
            source: TemplateSource::File(path),
            params,
        }
    }

    pub fn is_not_found_page(&self, tree: &PageTree) -> bool {
        match &self.source {
            TemplateSource::InlineNotFound => true,
            TemplateSource::File(path) => tree.not_found_candidates().contains(path),
        }
    }
}

/// Read-only view of the pages root and the app root
#[derive(Debug, Clone)]
pub struct PageTree {
    pages_dir: PathBuf,
    app_dir: PathBuf,
    marker: char,
}

impl PageTree {
    pub fn new(pages_dir: impl Into<PathBuf>, app_dir: impl Into<PathBuf>, marker: char) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            app_dir: app_dir.into(),
            marker,
        }
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Resolve a template key (no leading `/`, no query string)
    pub fn resolve(&self, route_key: &str) -> Resolution {
        let segments: Vec<&str> = route_key.split('/').filter(|s| !s.is_empty()).collect();

        if segments.is_empty() || route_key == "index" || route_key == "home" {
            return self.resolve_home();
        }

        if !segments.iter().all(|s| is_safe_segment(s)) {
            tracing::debug!(route_key, "Rejected unsafe template key");
            return self.resolve_not_found();
        }

        let joined = segments
            .iter()
            .fold(self.pages_dir.clone(), |dir, segment| dir.join(segment));
        if let Some(path) = probe(&joined) {
            return Resolution::file(path, HashMap::new());
        }

        let mut params = HashMap::new();
        match self.walk(&self.pages_dir, &segments, &mut params) {
            Some(path) => Resolution::file(path, params),
            None => self.resolve_not_found(),
        }
    }

    fn resolve_home(&self) -> Resolution {
        let candidates = [
            self.pages_dir.join("home.html"),
            self.pages_dir.join("home").join(INDEX_FILE),
        ];
        match candidates.into_iter().find(|p| p.is_file()) {
            Some(path) => Resolution::file(path, HashMap::new()),
            None => self.resolve_not_found(),
        }
    }

    fn not_found_candidates(&self) -> [PathBuf; 2] {
        [
            self.app_dir.join("404.html"),
            self.app_dir.join("404").join(INDEX_FILE),
        ]
    }

    fn resolve_not_found(&self) -> Resolution {
        let source = self
            .not_found_candidates()
            .into_iter()
            .find(|p| p.is_file())
            .map_or(TemplateSource::InlineNotFound, TemplateSource::File);
        Resolution {
            source,
            params: HashMap::new(),
        }
    }

    /// Depth-first walk, literal before dynamic at every level
    fn walk(
        &self,
        dir: &Path,
        segments: &[&str],
        params: &mut HashMap<String, String>,
    ) -> Option<PathBuf> {
        let Some((segment, rest)) = segments.split_first() else {
            return probe(dir);
        };

        let candidates = self.candidates(dir, rest.is_empty());

        if candidates.contains(*segment) {
            return self.walk(&dir.join(segment), rest, params);
        }

        for name in candidates.iter().filter(|name| name.starts_with(self.marker)) {
            let mut bound = params.clone();
            bound.insert(
                name[self.marker.len_utf8()..].to_string(),
                (*segment).to_string(),
            );
            if let Some(found) = self.walk(&dir.join(name), rest, &mut bound) {
                *params = bound;
                return Some(found);
            }
        }

        None
    }

    /// Names a segment can match in `dir`: subdirectories, plus `.html`
    /// file stems when matching the last segment. Listed once, sorted.
    fn candidates(&self, dir: &Path, last_segment: bool) -> BTreeSet<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return BTreeSet::new();
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let file_type = entry.file_type().ok()?;
                if file_type.is_dir() {
                    Some(name)
                } else if last_segment {
                    name.strip_suffix(TEMPLATE_EXT)
                        .filter(|stem| !stem.is_empty())
                        .map(str::to_string)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// `{dir}/index.html`, then the sibling `{dir}.html`
fn probe(dir: &Path) -> Option<PathBuf> {
    [dir.join(INDEX_FILE), sibling_html(dir)]
        .into_iter()
        .find(|p| p.is_file())
}

fn sibling_html(dir: &Path) -> PathBuf {
    let mut raw: OsString = dir.as_os_str().to_owned();
    raw.push(TEMPLATE_EXT);
    PathBuf::from(raw)
}

fn is_safe_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && !segment.contains('\\') && !segment.contains('\0')
}
