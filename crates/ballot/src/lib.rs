// Ballot - self-hosted polls
// JSON API controllers plus file-system routed HTML pages behind one dispatcher

pub mod codec;
pub mod config;
pub mod response;
pub mod registry;
pub mod view;
pub mod assets;
pub mod dispatcher;

// Poll storage and rules
pub mod database;
pub mod polls;
pub mod controllers;

pub mod app;

// Re-export core types
pub use app::{build_app, build_dispatcher, router};
pub use codec::{query_params, read_json_body, BodyError, BodyOptions, QueryParams};
pub use config::Config;
pub use dispatcher::{Dispatcher, RequestKind};
pub use registry::{Handler, Route, RouteRegistry};
pub use response::{ApiReply, ServiceResult};
pub use view::{PageTree, ViewResolver};

// Re-export commonly used types from dependencies
pub use axum;
pub use axum::http::StatusCode;
