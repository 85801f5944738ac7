//! End-to-end tests driving the router the server runs
//!
//! Each test builds a throwaway site (layout, pages, public assets) in a
//! temporary directory and an in-memory SQLite database.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use ballot::assets::StaticFiles;
use ballot::database::init_db;
use ballot::{build_dispatcher, router, ApiReply, Config, Dispatcher, QueryParams, RouteRegistry, ViewResolver};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use std::fs;
use tempfile::TempDir;
use tower::ServiceExt;

const SITE: &[(&str, &str)] = &[
    ("app/layout.html", "<html><body>{{content}}</body></html>"),
    ("app/404.html", "<h1>Nothing at {{path}}</h1>"),
    ("app/pages/home.html", "<h1>{{site.name}}</h1>"),
    ("app/pages/poll/:id/index.html", "<p>poll {{id}} {{tab}}</p>"),
    ("app/pages/poll/results.html", "<p>all results</p>"),
    ("public/css/site.css", "body { margin: 0; }"),
];

fn site() -> TempDir {
    let root = TempDir::new().unwrap();
    for (file, content) in SITE {
        let path = root.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    root
}

fn config(root: &TempDir) -> Config {
    let mut config = Config::default();
    let dir = |p: &str| root.path().join(p).to_string_lossy().into_owned();
    config.routing.app_dir = dir("app");
    config.routing.pages_dir = dir("app/pages");
    config.assets.public_dir = dir("public");
    config.database.url = "sqlite::memory:".to_string();
    config.limits.max_body_bytes = 256;
    config
}

async fn app(root: &TempDir) -> Router {
    let config = config(root);
    let pool = init_db(&config.database.url).await.unwrap();
    router(build_dispatcher(&config, pool))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    json_body: Option<&str>,
) -> (StatusCode, HeaderMap, String) {
    let mut request = Request::builder().method(method).uri(uri);
    if json_body.is_some() {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }
    let request = request
        .body(json_body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn parse(body: &str) -> JsonValue {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let root = site();
    let app = app(&root).await;

    let (status, headers, body) = send(&app, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json; charset=utf-8");
    assert_eq!(parse(&body), json!({ "error": "API endpoint not found" }));

    // Registered path, unregistered method
    let (status, _, _) = send(&app, "DELETE", "/api/polls", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No trailing-slash normalization
    let (status, _, _) = send(&app, "GET", "/api/health/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let root = site();
    let app = app(&root).await;

    let (status, headers, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(parse(&body)["status"], "ok");
}

#[tokio::test]
async fn test_handler_failures_become_500() {
    let root = site();
    let config = config(&root);

    let mut broken = RouteRegistry::new("broken", "/api", "/broken");
    broken.register("/error", "GET", |_q: QueryParams, _b: Body, _h: HeaderMap| async {
        Err::<ApiReply, _>(anyhow::anyhow!("database unavailable"))
    });
    broken.register("/panic", "GET", |_q: QueryParams, _b: Body, _h: HeaderMap| async {
        if true {
            panic!("handler blew up");
        }
        Ok::<_, anyhow::Error>(ApiReply::ok(json!({})))
    });

    let dispatcher = Dispatcher::new(
        "/api",
        "Ballot",
        vec![broken],
        ViewResolver::from_config(&config),
        StaticFiles::new(config.public_dir(), false),
    );
    let app = router(dispatcher);

    let (status, _, body) = send(&app, "GET", "/api/broken/error", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse(&body), json!({ "error": "database unavailable" }));

    let (status, _, body) = send(&app, "GET", "/api/broken/panic", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse(&body), json!({ "error": "handler blew up" }));

    // The server keeps answering after a panic
    let (status, _, _) = send(&app, "GET", "/api/broken/error", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_page_views() {
    let root = site();
    let app = app(&root).await;

    let (status, headers, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(body, "<html><body><h1>Ballot</h1></body></html>");

    let (_, _, body) = send(&app, "GET", "/poll/42?tab=%3Cb%3E", None).await;
    assert_eq!(body, "<html><body><p>poll 42 &lt;b&gt;</p></body></html>");

    let (_, _, body) = send(&app, "GET", "/poll/results", None).await;
    assert_eq!(body, "<html><body><p>all results</p></body></html>");
}

#[tokio::test]
async fn test_missing_page_is_200_with_404_content() {
    let root = site();
    let app = app(&root).await;

    let (status, _, body) = send(&app, "GET", "/no/such/page", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html><body><h1>Nothing at /no/such/page</h1></body></html>");

    let (status, _, body) = send(&app, "GET", "/it's", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html><body><h1>Nothing at /it&#39;s</h1></body></html>");
}

#[tokio::test]
async fn test_static_assets() {
    let root = site();
    let app = app(&root).await;

    let (status, headers, body) = send(&app, "GET", "/css/site.css", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/css; charset=utf-8");
    assert_eq!(body, "body { margin: 0; }");

    let (status, _, _) = send(&app, "GET", "/css/missing.css", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_body_rejections() {
    let root = site();
    let app = app(&root).await;

    let oversize = json!({ "question": "q".repeat(300), "options": ["a", "b"] }).to_string();
    let (status, _, body) = send(&app, "POST", "/api/polls", Some(&oversize)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(parse(&body)["success"], false);

    let (status, _, _) = send(&app, "POST", "/api/polls", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/votes")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_poll_lifecycle() {
    let root = site();
    let app = app(&root).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/polls",
        Some(r#"{"question":"Tabs or spaces?","options":["tabs","spaces"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let created = parse(&body);
    assert_eq!(created["success"], true);
    let poll_id = created["data"]["id"].as_str().unwrap().to_string();
    let spaces = created["data"]["options"][1]["id"].as_i64().unwrap();

    let (status, _, body) = send(&app, "GET", "/api/polls?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["data"].as_array().unwrap().len(), 1);

    let vote = json!({ "pollId": poll_id, "optionId": spaces, "voterId": "ann" }).to_string();
    let (status, _, _) = send(&app, "POST", "/api/votes", Some(&vote)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, "POST", "/api/votes", Some(&vote)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"], "You have already voted in this poll");

    let (_, _, body) = send(&app, "GET", &format!("/api/polls/results?id={poll_id}"), None).await;
    let results = parse(&body);
    assert_eq!(results["data"]["totalVotes"], 1);
    assert_eq!(results["data"]["options"][1]["votes"], 1);

    let (_, _, body) = send(&app, "GET", &format!("/api/votes/count?pollId={poll_id}"), None).await;
    assert_eq!(parse(&body)["data"], 1);

    let (status, _, body) = send(&app, "GET", "/api/polls/detail?id=missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse(&body)["error"], "Poll not found");

    let (status, _, _) = send(&app, "GET", "/api/polls/detail", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
