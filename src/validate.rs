//! Validation dispatch and the submission flow.
//!
//! This includes:
//!   - Dispatching a submission to the deterministic comparator (AUTO) or
//!     the external judge (IA)
//!   - Aggregating sub-question verdicts for composite questions
//!   - `submit_answer`: attempt limiting, dispatch, snapshotting, recording
//!
//! Failure paths stay distinguishable from wrong answers: a judge outage is
//! `JudgeUnavailable` (retryable, consumes no attempt), never a verdict.

use std::collections::BTreeMap;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::ValidationMethod;
use crate::compare;
use crate::domain::{QuestionRecord, StudentAnswer, SubmittedAnswer};
use crate::errors::CoreError;
use crate::snapshot::{snapshot_challenge, snapshot_question};
use crate::state::AppState;

/// Outcome of validating one submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
  pub is_correct: bool,
  pub points_earned: u32,
  pub feedback_english: Option<String>,
  pub feedback_spanish: Option<String>,
}

impl Verdict {
  fn deterministic(is_correct: bool, points_earned: u32) -> Self {
    Self { is_correct, points_earned, feedback_english: None, feedback_spanish: None }
  }
}

/// Validate a single (non-composite) question's submission.
#[instrument(level = "info", skip(state, submitted), fields(question_id = %q.id, type_tag = %q.type_tag, shape = submitted.shape_name()))]
pub async fn validate(
  state: &AppState,
  q: &QuestionRecord,
  submitted: &SubmittedAnswer,
) -> Result<Verdict, CoreError> {
  match q.validation_method {
    ValidationMethod::Auto => {
      let (is_correct, points_earned) = compare::compare(q, submitted)?;
      Ok(Verdict::deterministic(is_correct, points_earned))
    }
    ValidationMethod::Ia => {
      let judge = state
        .judge
        .as_ref()
        .ok_or_else(|| CoreError::JudgeUnavailable("no judge configured".into()))?;

      let answer_text = match submitted {
        SubmittedAnswer::Text(s) => s.clone(),
        SubmittedAnswer::Audio { audio_base64, mime } => {
          judge.transcribe(audio_base64, mime).await?
        }
        other => {
          return Err(CoreError::MalformedPayload {
            type_tag: q.type_tag.as_tag().to_string(),
            detail: format!("judge-validated types take text or audio, got {}", other.shape_name()),
          })
        }
      };

      let v = judge
        .evaluate(&state.prompts, &q.text, &q.instructions, &answer_text)
        .await?;
      let points_earned = ((v.score * q.points as f32).round() as u32).min(q.points);
      Ok(Verdict {
        is_correct: v.correct,
        points_earned,
        feedback_english: some_nonempty(v.feedback_english),
        feedback_spanish: some_nonempty(v.feedback_spanish),
      })
    }
  }
}

/// Combine per-sub-question verdicts into a parent-level score.
///
/// Conjunctive correctness: one wrong sub-answer marks the composite
/// incorrect, though partial points are still awarded. Missing sub-answers
/// count as incorrect with zero points, not as an error.
#[instrument(level = "info", skip(state, sub_answers), fields(question_id = %parent.id, answered = sub_answers.len()))]
pub async fn aggregate(
  state: &AppState,
  parent: &QuestionRecord,
  sub_answers: &BTreeMap<String, SubmittedAnswer>,
) -> Result<Verdict, CoreError> {
  let children = state.get_children(&parent.id).await;
  if children.is_empty() {
    return Err(CoreError::InvalidQuestion(format!(
      "question {} has no sub-questions to aggregate",
      parent.id
    )));
  }

  // Checked, not assumed: the parent's points must equal the children's sum.
  let expected_total: u32 = children.iter().map(|c| c.points).sum();
  if expected_total != parent.points {
    return Err(CoreError::InvalidQuestion(format!(
      "parent {} declares {} points but sub-questions sum to {}",
      parent.id, parent.points, expected_total
    )));
  }

  let mut all_correct = true;
  let mut total: u32 = 0;
  let mut feedback_en: Vec<String> = vec![];
  let mut feedback_es: Vec<String> = vec![];

  for child in &children {
    match sub_answers.get(&child.id) {
      Some(sub) => {
        let v = validate(state, child, sub).await?;
        all_correct &= v.is_correct;
        total += v.points_earned;
        if let Some(f) = v.feedback_english {
          feedback_en.push(f);
        }
        if let Some(f) = v.feedback_spanish {
          feedback_es.push(f);
        }
      }
      None => {
        warn!(target: "question", parent = %parent.id, child = %child.id, "Sub-question skipped by student");
        all_correct = false;
      }
    }
  }

  Ok(Verdict {
    is_correct: all_correct,
    points_earned: total.min(parent.points),
    feedback_english: some_nonempty(feedback_en.join(" ")),
    feedback_spanish: some_nonempty(feedback_es.join(" ")),
  })
}

/// The full submission flow: attempt limiting, validation dispatch,
/// synchronous snapshotting, and recording. Returns the persisted-ready
/// student answer.
#[instrument(level = "info", skip(state, submitted), fields(%question_id, %student_id))]
pub async fn submit_answer(
  state: &AppState,
  question_id: &str,
  student_id: &str,
  submitted: SubmittedAnswer,
  time_spent_secs: u32,
) -> Result<StudentAnswer, CoreError> {
  let q = state
    .get_question(question_id)
    .await
    .ok_or_else(|| CoreError::NotFound(format!("question {question_id}")))?;

  if q.is_sub_question() {
    return Err(CoreError::InvalidQuestion(format!(
      "question {question_id} is a sub-question; submit to its parent"
    )));
  }

  // Attempt-limit enforcement precedes dispatch.
  let attempt = state.attempts_so_far(student_id, question_id).await + 1;
  if attempt > q.max_attempts {
    return Err(CoreError::ValidationRefused {
      question_id: question_id.to_string(),
      attempt,
      max: q.max_attempts,
    });
  }

  let children = state.get_children(&q.id).await;
  let verdict = if children.is_empty() {
    validate(state, &q, &submitted).await?
  } else {
    match &submitted {
      SubmittedAnswer::Keyed(map) => aggregate(state, &q, map).await?,
      other => {
        return Err(CoreError::MalformedPayload {
          type_tag: q.type_tag.as_tag().to_string(),
          detail: format!(
            "composite questions take a map of sub-question id to answer, got {}",
            other.shape_name()
          ),
        })
      }
    }
  };

  // Snapshots are captured synchronously, before the answer is recorded;
  // an incomplete source blocks creation entirely.
  let question_snapshot = snapshot_question(&q)?;
  let challenge_snapshot = match state.get_challenge(&q.challenge_id).await {
    Some(c) => Some(snapshot_challenge(&c)?),
    None => None,
  };

  let answer = StudentAnswer {
    id: Uuid::new_v4().to_string(),
    student_id: student_id.to_string(),
    question_id: question_id.to_string(),
    challenge_id: q.challenge_id.clone(),
    user_answer: submitted,
    attempt_number: 0, // assigned by record_answer
    is_correct: verdict.is_correct,
    points_earned: verdict.points_earned,
    time_spent_secs,
    feedback_english: verdict.feedback_english,
    feedback_spanish: verdict.feedback_spanish,
    question_snapshot,
    challenge_snapshot,
  };

  let recorded = state.record_answer(answer, q.max_attempts).await?;
  info!(target: "question", id = %question_id, attempt = recorded.attempt_number,
        correct = recorded.is_correct, points = recorded.points_earned, "Answer recorded");
  Ok(recorded)
}

fn some_nonempty(s: String) -> Option<String> {
  let t = s.trim();
  if t.is_empty() {
    None
  } else {
    Some(t.to_string())
  }
}
