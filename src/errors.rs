//! Core error taxonomy.
//!
//! Every failure path here is distinguishable from a genuine wrong answer:
//! a wrong answer is a successful validation with `is_correct = false`,
//! never an error. The variants map to different remediation paths
//! (resubmit vs retry-later vs contact support), which is why they map to
//! different HTTP status codes.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
  /// Attempt limit exceeded. Fatal to this submission; never retried.
  #[error("attempt {attempt} exceeds max_attempts {max} for question {question_id}")]
  ValidationRefused { question_id: String, attempt: u32, max: u32 },

  /// Submitted answer shape does not match the type's expected shape.
  #[error("malformed answer payload for type '{type_tag}': {detail}")]
  MalformedPayload { type_tag: String, detail: String },

  /// External judge timed out, errored, or is not configured.
  /// Retryable by the caller with backoff; never a correctness verdict.
  #[error("external judge unavailable: {0}")]
  JudgeUnavailable(String),

  /// Source question/challenge is missing required fields. Blocks Student
  /// Answer creation entirely.
  #[error("snapshot incomplete: {0}")]
  SnapshotIncomplete(String),

  /// Referenced entity does not exist in the stores.
  #[error("not found: {0}")]
  NotFound(String),

  /// Question definition violates a structural invariant (bad phase tag,
  /// composite points mismatch, ...).
  #[error("invalid question: {0}")]
  InvalidQuestion(String),
}

impl IntoResponse for CoreError {
  fn into_response(self) -> Response {
    let (status, retryable) = match &self {
      CoreError::ValidationRefused { .. } => (StatusCode::CONFLICT, false),
      CoreError::MalformedPayload { .. } => (StatusCode::BAD_REQUEST, false),
      CoreError::JudgeUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, true),
      CoreError::SnapshotIncomplete(_) => {
        tracing::error!(target: "quizgrade_backend", error = %self, "snapshot incomplete");
        (StatusCode::INTERNAL_SERVER_ERROR, false)
      }
      CoreError::NotFound(_) => (StatusCode::NOT_FOUND, false),
      CoreError::InvalidQuestion(_) => (StatusCode::UNPROCESSABLE_ENTITY, false),
    };
    let body = Json(json!({
      "error": self.to_string(),
      "retryable": retryable,
    }));
    (status, body).into_response()
  }
}
