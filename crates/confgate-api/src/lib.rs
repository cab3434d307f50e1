//! # confgate-api: HTTP Driver
//!
//! Serves the confgate pipeline over HTTP. Each request assembles its own
//! inputs from a multipart upload and runs a fresh
//! [`Pipeline`](confgate_pipeline::Pipeline) built from the immutable
//! server configuration; no evaluation state is shared between requests.
//!
//! ## API Surface
//!
//! | Route                 | Module                  | Purpose                |
//! |-----------------------|-------------------------|------------------------|
//! | `GET /`               | [`routes::validate`]    | Banner                 |
//! | `POST /v1/validate`   | [`routes::validate`]    | Validate uploads       |
//! | `POST /validate`      | [`routes::validate`]    | Legacy alias           |
//! | `GET /v1/metrics`     | [`routes::metrics`]     | Prometheus metrics     |
//! | `GET /openapi.json`   | [`openapi`]             | OpenAPI document       |
//! | `GET /health/*`       | this module             | Liveness and readiness |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::validate::router(state.config.body_limit))
        .merge(routes::metrics::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Bind `0.0.0.0:<port>` and serve until the process exits.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "confgate API listening");
    axum::serve(listener, app(state)).await
}

/// Liveness check. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. Returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
