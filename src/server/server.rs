//! App assembly and server startup.

use anyhow::Result;
use std::time::{Duration, Instant};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use super::auth_routes::make_auth_routes;
use super::catalog_routes::make_catalog_routes;
use super::metrics::metrics_handler;
use super::review_routes::make_review_routes;
use super::session::Session;
use super::state::{GuardedCatalogStore, GuardedUserManager, ServerState};
use super::user_routes::make_user_routes;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub username: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        username: session.map(|s| s.username),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    user_manager: GuardedUserManager,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        catalog_store,
        user_manager,
        hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
    };

    let v1_routes: Router = make_catalog_routes(state.clone())
        .merge(make_review_routes(state.clone()))
        .merge(make_user_routes(state.clone()))
        .nest("/auth", make_auth_routes(state.clone()));

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    home_router
        .nest("/v1", v1_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    user_manager: GuardedUserManager,
    metrics_port: u16,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, catalog_store, user_manager);

    let metrics_app: Router = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port)).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!("Metrics server failed: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Serving at port {}", port);

    Ok(axum::serve(listener, app).await?)
}
