//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic; each handler is instrumented and logs parameters plus basic
//! result info. Errors surface through `CoreError::into_response`.

use std::{future::Future, pin::Pin, sync::Arc};

use axum::{
  extract::{Path, State},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::errors::CoreError;
use crate::format::{format_question, FormatInput, QuestionView};
use crate::protocol::{to_answer_out, CreateQuestionIn, HealthOut, StudentAnswerOut, SubmitAnswerIn};
use crate::state::AppState;
use crate::validate::submit_answer;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body), fields(challenge_id = %body.challenge_id, type_tag = %body.type_tag, subs = body.sub_questions.len()))]
pub async fn http_create_question(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateQuestionIn>,
) -> Result<impl IntoResponse, CoreError> {
  let q = state.create_question(body).await?;
  info!(target: "question", id = %q.id, "HTTP question created");
  Ok(Json(q))
}

#[instrument(level = "info", skip(state, body), fields(%body.question_id, %body.student_id))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SubmitAnswerIn>,
) -> Result<Json<StudentAnswerOut>, CoreError> {
  let answer = submit_answer(
    &state,
    &body.question_id,
    &body.student_id,
    body.answer,
    body.time_spent,
  )
  .await?;
  info!(target: "question", id = %body.question_id, attempt = answer.attempt_number,
        correct = answer.is_correct, "HTTP submit_answer evaluated");
  Ok(Json(to_answer_out(&answer)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuestionView>, CoreError> {
  let input = build_format_input(&state, &id).await?;
  info!(target: "question", %id, "HTTP question served for display");
  Ok(Json(format_question(&input)))
}

/// Walk the store for a question, its media, and its sub-questions
/// (recursively), producing the formatter's pure input.
fn build_format_input<'a>(
  state: &'a AppState,
  id: &'a str,
) -> Pin<Box<dyn Future<Output = Result<FormatInput, CoreError>> + Send + 'a>> {
  Box::pin(async move {
    let question = state
      .get_question(id)
      .await
      .ok_or_else(|| CoreError::NotFound(format!("question {id}")))?;
    let media = state.media_for(&question.media_ids).await;
    let mut children = Vec::new();
    for child in state.get_children(id).await {
      children.push(build_format_input(state, &child.id).await?);
    }
    Ok(FormatInput { question, media, children })
  })
}
