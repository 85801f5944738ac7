// File: src/codec.rs
// Purpose: Query string parsing and size-limited JSON body reading

use axum::body::Body;
use axum::http::{header, HeaderMap};
use futures_util::StreamExt;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Media type expected for API request bodies
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Query parameters from URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    /// Create from HashMap
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a query parameter value
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a query parameter as a specific type
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.params.get(key)?.parse().ok()
    }

    /// Check if a parameter exists
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Get as HashMap
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Extract query parameters from a raw request path (Pure function)
///
/// Everything after the first `?` is decoded as `key=value&...`. A pair
/// without `=` yields an empty value, later duplicates replace earlier ones.
///
/// # Examples
/// ```
/// use ballot::codec::query_params;
///
/// let query = query_params("/x?a=1&b=2");
/// assert_eq!(query.get("a"), Some(&"1".to_string()));
/// assert!(query_params("/x").is_empty());
/// assert!(query_params("/x?").is_empty());
/// assert_eq!(query_params("/x?a=").get("a"), Some(&String::new()));
/// ```
pub fn query_params(raw_path: &str) -> QueryParams {
    let Some((_, query)) = raw_path.split_once('?') else {
        return QueryParams::default();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Strip the query string from a raw request path
pub fn pathname(raw_path: &str) -> &str {
    raw_path.split_once('?').map_or(raw_path, |(path, _)| path)
}

/// Form-style decoding: `+` is a space, invalid escapes are kept verbatim
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

// ============================================================================
// REQUEST BODIES
// ============================================================================

/// Limits applied when reading a request body
#[derive(Debug, Clone)]
pub struct BodyOptions {
    pub max_size: usize,
    pub content_type: String,
}

impl BodyOptions {
    /// JSON body with the given size limit
    pub fn json(max_size: usize) -> Self {
        Self {
            max_size,
            content_type: JSON_MEDIA_TYPE.to_string(),
        }
    }
}

/// Why a request body was rejected
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("expected content-type {expected}, got {actual}")]
    ContentTypeMismatch { expected: String, actual: String },

    #[error("invalid JSON body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Read and parse a JSON request body
///
/// The content type and declared length are checked before any bytes are
/// read, and reading stops as soon as the limit is crossed, so an oversize
/// body is never handed to the JSON parser.
pub async fn read_json_body(
    body: Body,
    options: &BodyOptions,
    headers: &HeaderMap,
) -> Result<JsonValue, BodyError> {
    if let Some(actual) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        if !media_type_matches(actual, &options.content_type) {
            return Err(BodyError::ContentTypeMismatch {
                expected: options.content_type.clone(),
                actual: actual.to_string(),
            });
        }
    }

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    if declared.is_some_and(|len| len > options.max_size) {
        return Err(BodyError::TooLarge {
            limit: options.max_size,
        });
    }

    let bytes = collect_limited(body, options.max_size).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn collect_limited(body: Body, max_size: usize) -> Result<Vec<u8>, BodyError> {
    let mut stream = body.into_data_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BodyError::Read(e.to_string()))?;
        if buffer.len() + chunk.len() > max_size {
            return Err(BodyError::TooLarge { limit: max_size });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer)
}

/// Compare media types, ignoring parameters such as `charset`
fn media_type_matches(actual: &str, expected: &str) -> bool {
    let essence = actual.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(expected.trim())
}
