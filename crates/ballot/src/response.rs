// File: src/response.rs
// Purpose: JSON/HTML response builders and the uniform service result envelope

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

// ============================================================================
// API replies
// ============================================================================

/// What an API handler produces: a JSON body and the status to send it with
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl ApiReply {
    /// 200 with the given body
    pub fn ok(body: JsonValue) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn with_status(status: StatusCode, body: JsonValue) -> Self {
        Self { status, body }
    }
}

pub fn error_body(message: impl Into<String>) -> JsonValue {
    json!({ "error": message.into() })
}

/// JSON response with the API's fixed headers
pub fn json_response(status: StatusCode, body: &JsonValue) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, JSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body.to_string(),
    )
        .into_response()
}

/// Page-view response (always 200, see the view resolver)
pub fn html_response(html: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
        html,
    )
        .into_response()
}

// ============================================================================
// Service result envelope
// ============================================================================

/// Uniform result returned by persistence services
///
/// Serializes as `{ success, data?, error?, message? }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ServiceResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> ServiceResult<T> {
    /// 200 on success, otherwise the given failure status; the envelope is the body
    pub fn into_reply(self, failure_status: StatusCode) -> anyhow::Result<ApiReply> {
        let status = if self.success {
            StatusCode::OK
        } else {
            failure_status
        };
        Ok(ApiReply::with_status(status, serde_json::to_value(&self)?))
    }
}
