// GET /metrics: corpus counts and hold-out accuracies computed at startup.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::web::AppState;

pub async fn get_metrics(State(state): State<AppState>) -> Response {
    match state.context() {
        Ok(context) => Json(context.model_metrics().clone()).into_response(),
        Err(unavailable) => unavailable,
    }
}
