// Web server — Axum JSON API over the inference context.
//
// The listener binds immediately and the context is built in the
// background. Until it is ready the pipeline routes answer 503 with
// {"error": "Model not initialized"}; /health reports "initializing".
// If initialization fails the server shuts down with that error.

use std::future::IntoFuture;
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::context::{self, InferenceContext};

pub mod handlers;

/// Message returned by pipeline routes before the context is ready.
pub const NOT_INITIALIZED: &str = "Model not initialized";

/// Shared application state threaded through all Axum handlers.
#[derive(Clone, Default)]
pub struct AppState {
    context: Arc<OnceLock<Arc<InferenceContext>>>,
}

impl AppState {
    /// State whose context will be filled in later via `set_ready`.
    pub fn initializing() -> Self {
        Self::default()
    }

    /// State with a context already built.
    pub fn ready(context: InferenceContext) -> Self {
        let state = Self::default();
        state.set_ready(context);
        state
    }

    /// Publish the context. Later calls are ignored.
    pub fn set_ready(&self, context: InferenceContext) {
        if self.context.set(Arc::new(context)).is_err() {
            error!("Inference context was already initialized");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.context.get().is_some()
    }

    /// The context, or the 503 response handlers return while it is missing.
    pub fn context(&self) -> Result<Arc<InferenceContext>, Response> {
        self.context
            .get()
            .cloned()
            .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, NOT_INITIALIZED))
    }
}

/// Start the Axum web server and block until it exits.
///
/// Returns an error if the inference context cannot be built.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    let state = AppState::initializing();
    let app = build_router(state.clone());

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Quizmatch API listening on http://{addr}");

    let init = async move {
        let context = tokio::task::spawn_blocking(move || context::initialize(&config))
            .await
            .context("Initialization task panicked")??;
        state.set_ready(context);
        info!("Model ready, accepting requests");
        std::future::pending::<Result<()>>().await
    };

    tokio::select! {
        served = axum::serve(listener, app).into_future() => served?,
        result = init => {
            if let Err(ref e) = result {
                error!("Initialization failed, shutting down: {e:#}");
            }
            return result.context("Initialization failed");
        }
    }
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/check_question", post(handlers::check::check_question))
        .route("/check_file", post(handlers::batch::check_file))
        .route("/topics", get(handlers::topics::list_topics))
        .route("/metrics", get(handlers::metrics::get_metrics))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check. 200 in both states so orchestrators can tell "up" from
/// "ready" by the body.
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let status = if state.is_ready() { "ok" } else { "initializing" };
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": status })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

/// Run blocking inference off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "Inference task failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Inference task failed")
    })
}
