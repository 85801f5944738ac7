// File: src/app.rs
// Purpose: Composition root - wires configuration, storage, controllers and views into a router

use crate::assets::StaticFiles;
use crate::config::Config;
use crate::controllers::{build_controllers, ControllerContext};
use crate::database::init_db;
use crate::dispatcher::{dispatch, Dispatcher};
use crate::polls::PollService;
use crate::view::ViewResolver;
use anyhow::{Context, Result};
use axum::Router;
use sqlx::AnyPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the dispatcher for an already connected pool
pub fn build_dispatcher(config: &Config, pool: AnyPool) -> Dispatcher {
    let ctx = ControllerContext::new(&config.routing.api_root, config.limits.max_body_bytes);
    let controllers = build_controllers(&ctx, PollService::new(pool));

    for controller in &controllers {
        for route in controller.list() {
            tracing::info!(controller = controller.name(), method = %route.method, path = %route.path, "Registered API route");
        }
    }

    Dispatcher::new(
        &config.routing.api_root,
        &config.site.name,
        controllers,
        ViewResolver::from_config(config),
        StaticFiles::new(config.public_dir(), config.is_development()),
    )
}

/// Every request, whatever its path or method, goes to the dispatcher
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(Arc::new(dispatcher))
        .layer(TraceLayer::new_for_http())
}

/// Connect to the configured database and build the full application
pub async fn build_app(config: &Config) -> Result<Router> {
    let pool = init_db(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    Ok(router(build_dispatcher(config, pool)))
}
