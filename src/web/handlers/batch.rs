// POST /check_file — analyze every question in an uploaded batch file.
//
// Multipart form with the file in field "file". Accepts .csv, .txt, .xlsx,
// .xls and .docx; other formats get 415 and unreadable contents get 400.
// Returns one record per question, in file order.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::AnalysisRecord;
use crate::intake::read_questions;
use crate::web::{api_error, run_blocking, AppState};

/// One row of the batch response.
#[derive(Debug, Serialize)]
pub struct BatchRecord {
    pub question: String,
    pub similar_questions: bool,
    pub same_topic: bool,
    pub predicted_topic: String,
    pub similar_question_name: Option<String>,
    pub marks: i64,
    pub weightage: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<AnalysisRecord> for BatchRecord {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            question: record.question,
            similar_questions: record.similarity.similar_exists,
            same_topic: record.similarity.same_topic,
            predicted_topic: record.similarity.predicted_topic,
            similar_question_name: record.similarity.matched_question,
            marks: record.attributes.marks as i64,
            weightage: record.attributes.weightage as i64,
            error: record.error,
        }
    }
}

pub async fn check_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let context = match state.context() {
        Ok(c) => c,
        Err(unavailable) => return unavailable,
    };

    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => return api_error(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let (filename, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => break (filename, bytes),
                    Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.body_text()),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => return api_error(StatusCode::BAD_REQUEST, "No file uploaded"),
            Err(e) => return api_error(StatusCode::BAD_REQUEST, &e.body_text()),
        }
    };

    let questions = match read_questions(&filename, &bytes) {
        Ok(q) => q,
        Err(e) => {
            warn!(filename = %filename, error = %e, "Rejected batch file");
            let status = if e.is_malformed() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            };
            return api_error(status, &e.to_string());
        }
    };

    info!(filename = %filename, questions = questions.len(), "Analyzing uploaded batch");

    match run_blocking(move || context.analyze_batch(&questions)).await {
        Ok(records) => {
            let body: Vec<BatchRecord> = records.into_iter().map(BatchRecord::from).collect();
            Json(body).into_response()
        }
        Err(failed) => failed,
    }
}
