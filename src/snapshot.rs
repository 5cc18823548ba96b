//! Point-in-time snapshots of questions and challenges.
//!
//! A snapshot is a plain, depth-limited copy taken synchronously when a
//! student answer is created. It holds no references back to the live
//! records, so later edits never alter historical grading or display.
//! The answer key is retained internally for re-grading audits but is
//! omitted from every client-facing projection (see `protocol`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{QuestionType, ValidationMethod};
use crate::domain::{is_valid_phase, AnswerKey, Challenge, QuestionRecord, Stage};
use crate::errors::CoreError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionSnapshot {
  pub question_id: String,
  pub stage: Stage,
  pub phase: String,
  pub position: u32,
  pub type_tag: QuestionType,
  pub points: u32,
  pub time_limit_secs: u32,
  pub max_attempts: u32,
  pub text: String,
  pub instructions: String,
  pub content: Value,
  pub options: Value,
  pub configuration: Value,
  pub validation_method: ValidationMethod,
  /// Retained for audit only; never serialized toward clients.
  pub answer: AnswerKey,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChallengeSnapshot {
  pub challenge_id: String,
  pub title: String,
  pub description: String,
  pub stage: Stage,
}

/// Copy the snapshot fields out of a live question, rejecting sources that
/// would leave an incomplete historical record.
pub fn snapshot_question(q: &QuestionRecord) -> Result<QuestionSnapshot, CoreError> {
  if q.id.trim().is_empty() {
    return Err(CoreError::SnapshotIncomplete("question id is empty".into()));
  }
  if q.text.trim().is_empty() {
    return Err(CoreError::SnapshotIncomplete(format!(
      "question {} has no prompt text",
      q.id
    )));
  }
  if !is_valid_phase(&q.phase) {
    return Err(CoreError::SnapshotIncomplete(format!(
      "question {} has malformed phase '{}'",
      q.id, q.phase
    )));
  }

  Ok(QuestionSnapshot {
    question_id: q.id.clone(),
    stage: q.stage,
    phase: q.phase.clone(),
    position: q.position,
    type_tag: q.type_tag,
    points: q.points,
    time_limit_secs: q.time_limit_secs,
    max_attempts: q.max_attempts,
    text: q.text.clone(),
    instructions: q.instructions.clone(),
    content: q.content.clone(),
    options: q.options.clone(),
    configuration: q.configuration.clone(),
    validation_method: q.validation_method,
    answer: q.answer.clone(),
  })
}

pub fn snapshot_challenge(c: &Challenge) -> Result<ChallengeSnapshot, CoreError> {
  if c.id.trim().is_empty() {
    return Err(CoreError::SnapshotIncomplete("challenge id is empty".into()));
  }
  if c.title.trim().is_empty() {
    return Err(CoreError::SnapshotIncomplete(format!(
      "challenge {} has no title",
      c.id
    )));
  }

  Ok(ChallengeSnapshot {
    challenge_id: c.id.clone(),
    title: c.title.clone(),
    description: c.description.clone(),
    stage: c.stage,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::QuestionType;
  use serde_json::json;

  fn sample_question() -> QuestionRecord {
    QuestionRecord {
      id: "q1".into(),
      challenge_id: "ch1".into(),
      stage: Stage::Grammar,
      phase: "phase_1".into(),
      position: 1,
      type_tag: QuestionType::Tenses,
      points: 10,
      time_limit_secs: 60,
      max_attempts: 1,
      text: "Identify the verb tense.".into(),
      instructions: "Type the name of the tense.".into(),
      content: json!({"sentence": "He went to Paris."}),
      options: json!(["past_simple", "present_simple"]),
      answer: AnswerKey::Single("past_simple".into()),
      configuration: Value::Null,
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec![],
    }
  }

  #[test]
  fn snapshot_is_decoupled_from_later_edits() {
    let mut q = sample_question();
    let snap = snapshot_question(&q).expect("snapshot");
    q.text = "EDITED".into();
    q.points = 99;
    assert_eq!(snap.text, "Identify the verb tense.");
    assert_eq!(snap.points, 10);
  }

  #[test]
  fn snapshot_rejects_missing_text() {
    let mut q = sample_question();
    q.text = "  ".into();
    match snapshot_question(&q) {
      Err(CoreError::SnapshotIncomplete(_)) => {}
      other => panic!("expected SnapshotIncomplete, got {:?}", other),
    }
  }

  #[test]
  fn snapshot_rejects_malformed_phase() {
    let mut q = sample_question();
    q.phase = "phase_x".into();
    assert!(matches!(
      snapshot_question(&q),
      Err(CoreError::SnapshotIncomplete(_))
    ));
  }

  #[test]
  fn challenge_snapshot_requires_title() {
    let c = Challenge {
      id: "ch1".into(),
      title: String::new(),
      description: "desc".into(),
      stage: Stage::Grammar,
    };
    assert!(matches!(
      snapshot_challenge(&c),
      Err(CoreError::SnapshotIncomplete(_))
    ));
  }
}
