// File: src/controllers/polls.rs
// Purpose: Poll endpoints - list, create, detail and results

use super::{body_error_reply, envelope_reply, failure_reply, ControllerContext};
use crate::codec::{read_json_body, BodyOptions, QueryParams};
use crate::polls::PollService;
use crate::registry::RouteRegistry;
use crate::response::ApiReply;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;

/// Payload of `POST {api_root}/polls`
#[derive(Debug, Deserialize)]
pub struct NewPollRequest {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

pub fn controller(ctx: &ControllerContext, service: PollService) -> RouteRegistry {
    let mut registry = RouteRegistry::new("polls", &ctx.api_root, "/polls");

    let polls = service.clone();
    registry.register("", "GET", move |query: QueryParams, _body: Body, _headers: HeaderMap| {
        list(polls.clone(), query)
    });

    let polls = service.clone();
    let options = ctx.body_options.clone();
    registry.register("", "POST", move |_query: QueryParams, body: Body, headers: HeaderMap| {
        create(polls.clone(), options.clone(), body, headers)
    });

    let polls = service.clone();
    registry.register("/detail", "GET", move |query: QueryParams, _body: Body, _headers: HeaderMap| {
        detail(polls.clone(), query)
    });

    let polls = service;
    registry.register("/results", "GET", move |query: QueryParams, _body: Body, _headers: HeaderMap| {
        results(polls.clone(), query)
    });

    registry
}

async fn list(polls: PollService, query: QueryParams) -> anyhow::Result<ApiReply> {
    envelope_reply(polls.list_polls(query.get_as("limit")).await?)
}

async fn create(
    polls: PollService,
    options: BodyOptions,
    body: Body,
    headers: HeaderMap,
) -> anyhow::Result<ApiReply> {
    let payload = match read_json_body(body, &options, &headers).await {
        Ok(payload) => payload,
        Err(e) => return Ok(body_error_reply(&e)),
    };

    let request: NewPollRequest = match serde_json::from_value(payload) {
        Ok(request) => request,
        Err(e) => {
            return Ok(failure_reply(
                StatusCode::BAD_REQUEST,
                format!("Invalid poll payload: {e}"),
            ))
        }
    };

    envelope_reply(polls.create_poll(&request.question, &request.options).await?)
}

async fn detail(polls: PollService, query: QueryParams) -> anyhow::Result<ApiReply> {
    let Some(id) = query.get("id") else {
        return Ok(failure_reply(StatusCode::BAD_REQUEST, "Query parameter 'id' is required"));
    };
    envelope_reply(polls.get_poll(id).await?)
}

async fn results(polls: PollService, query: QueryParams) -> anyhow::Result<ApiReply> {
    let Some(id) = query.get("id") else {
        return Ok(failure_reply(StatusCode::BAD_REQUEST, "Query parameter 'id' is required"));
    };
    envelope_reply(polls.results(id).await?)
}
