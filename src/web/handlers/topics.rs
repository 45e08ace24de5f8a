// GET /topics: distinct topics in the question bank, sorted.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::web::AppState;

pub async fn list_topics(State(state): State<AppState>) -> Response {
    match state.context() {
        Ok(context) => {
            let topics: Vec<String> = context.list_topics().into_iter().collect();
            Json(topics).into_response()
        }
        Err(unavailable) => unavailable,
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::web::build_router;
    use crate::web::tests::{body_json, ready_state};

    #[tokio::test]
    async fn test_topics_sorted_and_distinct() {
        let app = build_router(ready_state());
        let response = app
            .oneshot(Request::builder().uri("/topics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!(["Biology", "Math", "Physics"])
        );
    }
}
