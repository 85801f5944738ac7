// File: src/controllers/votes.rs
// Purpose: Vote endpoints

use super::{body_error_reply, envelope_reply, failure_reply, ControllerContext};
use crate::codec::{read_json_body, BodyOptions, QueryParams};
use crate::polls::PollService;
use crate::registry::RouteRegistry;
use crate::response::ApiReply;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

/// Payload of `POST {api_root}/votes`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub poll_id: String,
    pub option_id: i64,
    #[serde(default)]
    pub voter_id: Option<String>,
}

pub fn controller(ctx: &ControllerContext, service: PollService) -> RouteRegistry {
    let mut registry = RouteRegistry::new("votes", &ctx.api_root, "/votes");

    let polls = service.clone();
    let options = ctx.body_options.clone();
    registry.register("", "POST", move |_query: QueryParams, body: Body, headers: HeaderMap| {
        cast(polls.clone(), options.clone(), body, headers)
    });

    let polls = service;
    registry.register("/count", "GET", move |query: QueryParams, _body: Body, _headers: HeaderMap| {
        count(polls.clone(), query)
    });

    registry
}

async fn cast(
    polls: PollService,
    options: BodyOptions,
    body: Body,
    headers: HeaderMap,
) -> anyhow::Result<ApiReply> {
    let payload = match read_json_body(body, &options, &headers).await {
        Ok(payload) => payload,
        Err(e) => return Ok(body_error_reply(&e)),
    };

    let vote: VoteRequest = match serde_json::from_value(payload) {
        Ok(vote) => vote,
        Err(e) => {
            return Ok(failure_reply(
                StatusCode::BAD_REQUEST,
                format!("Invalid vote payload: {e}"),
            ))
        }
    };

    envelope_reply(
        polls
            .cast_vote(&vote.poll_id, vote.option_id, vote.voter_id.as_deref())
            .await?,
    )
}

async fn count(polls: PollService, query: QueryParams) -> anyhow::Result<ApiReply> {
    let Some(poll_id) = query.get("pollId") else {
        return Ok(failure_reply(StatusCode::BAD_REQUEST, "Query parameter 'pollId' is required"));
    };
    envelope_reply(polls.vote_count(poll_id).await?)
}
