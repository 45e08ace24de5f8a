// POST /check_question — near-duplicate check for a single question.
//
// Body: {"question": "...", "topic": "..."} with topic optional.
// With a topic the response carries `invalid_topic` (true when the model
// predicts a different topic); without one it carries `predicted_topic`.
// Marks and weightage are truncated to integers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::context::{QuestionCheck, TopicResolution};
use crate::web::{api_error, run_blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub question: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub question: String,
    pub similar_questions: bool,
    pub same_topic: bool,
    pub similar_question_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_topic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_topic: Option<String>,
    pub marks: i64,
    pub weightage: i64,
}

impl From<QuestionCheck> for CheckResponse {
    fn from(check: QuestionCheck) -> Self {
        let (invalid_topic, predicted_topic) = match check.topic {
            TopicResolution::Checked { mismatch, .. } => (Some(mismatch), None),
            TopicResolution::Predicted { predicted } => (None, Some(predicted.topic)),
        };
        Self {
            question: check.question,
            similar_questions: check.similarity.similar_exists,
            same_topic: check.similarity.same_topic,
            similar_question_name: check.similarity.matched_question,
            invalid_topic,
            predicted_topic,
            marks: check.attributes.marks as i64,
            weightage: check.attributes.weightage as i64,
        }
    }
}

pub async fn check_question(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let context = match state.context() {
        Ok(c) => c,
        Err(unavailable) => return unavailable,
    };

    let Json(request) = match body {
        Ok(b) => b,
        Err(rejection) => return api_error(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let question = match request.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return api_error(StatusCode::BAD_REQUEST, "question is required"),
    };
    let topic = request.topic;

    let result = run_blocking(move || context.check_question(&question, topic.as_deref())).await;
    match result {
        Ok(Ok(check)) => Json(CheckResponse::from(check)).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "Question check failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
        Err(failed) => failed,
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::web::build_router;
    use crate::web::tests::{body_json, ready_state};

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/check_question")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_check_with_matching_topic() {
        let app = build_router(ready_state());
        let response = app
            .oneshot(post_json(r#"{"question":"What is 2+2?","topic":"Math"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["similar_questions"], true);
        assert_eq!(body["same_topic"], true);
        assert_eq!(body["similar_question_name"], "What is 2+2?");
        assert_eq!(body["invalid_topic"], false);
        assert!(body.get("predicted_topic").is_none());
        assert_eq!(body["marks"], 1);
        assert!(body["weightage"].is_i64());
    }

    #[tokio::test]
    async fn test_check_with_wrong_topic_flags_invalid() {
        let app = build_router(ready_state());
        let response = app
            .oneshot(post_json(r#"{"question":"What is 2+2?","topic":"Physics"}"#))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["similar_questions"], true);
        assert_eq!(body["same_topic"], false);
        assert_eq!(body["invalid_topic"], true);
    }

    #[tokio::test]
    async fn test_check_without_topic_returns_prediction() {
        let app = build_router(ready_state());
        let response = app
            .oneshot(post_json(r#"{"question":"Describe the rainfall patterns of monsoon"}"#))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["similar_questions"], false);
        assert_eq!(body["similar_question_name"], serde_json::Value::Null);
        assert!(body["predicted_topic"].is_string());
        assert!(body.get("invalid_topic").is_none());
    }

    #[tokio::test]
    async fn test_blank_question_is_bad_request() {
        let app = build_router(ready_state());
        let response = app.oneshot(post_json(r#"{"question":"   "}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "question is required");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = build_router(ready_state());
        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }
}
