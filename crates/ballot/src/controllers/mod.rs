//! API controllers.
//!
//! Each controller is a [`RouteRegistry`] mounted under the API root at its
//! own base path. The order returned by [`build_controllers`] is the order
//! the dispatcher consults them in.

pub mod health;
pub mod polls;
pub mod votes;

use crate::codec::{BodyError, BodyOptions};
use crate::polls::{PollService, POLL_NOT_FOUND};
use crate::registry::RouteRegistry;
use crate::response::{ApiReply, ServiceResult};
use axum::http::StatusCode;
use serde::Serialize;

/// Settings shared by every controller
#[derive(Debug, Clone)]
pub struct ControllerContext {
    pub api_root: String,
    pub body_options: BodyOptions,
}

impl ControllerContext {
    pub fn new(api_root: impl Into<String>, max_body_bytes: usize) -> Self {
        Self {
            api_root: api_root.into(),
            body_options: BodyOptions::json(max_body_bytes),
        }
    }
}

/// All controllers in dispatch order
pub fn build_controllers(ctx: &ControllerContext, polls: PollService) -> Vec<RouteRegistry> {
    vec![
        health::controller(ctx),
        polls::controller(ctx, polls.clone()),
        votes::controller(ctx, polls),
    ]
}

/// Structured reply for a rejected request body
pub fn body_error_reply(err: &BodyError) -> ApiReply {
    let status = match err {
        BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        BodyError::ContentTypeMismatch { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        BodyError::Parse(_) | BodyError::Read(_) => StatusCode::BAD_REQUEST,
    };
    failure_reply(status, err.to_string())
}

/// `{ success: false, error }` with the given status
pub fn failure_reply(status: StatusCode, error: impl Into<String>) -> ApiReply {
    ApiReply::with_status(
        status,
        serde_json::json!({ "success": false, "error": error.into() }),
    )
}

/// Reply for a service envelope: 404 for a missing poll, 400 for other rule violations
pub fn envelope_reply<T: Serialize>(result: ServiceResult<T>) -> anyhow::Result<ApiReply> {
    let failure_status = if result.error.as_deref() == Some(POLL_NOT_FOUND) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };
    result.into_reply(failure_status)
}
