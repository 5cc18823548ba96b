//! Public wire DTOs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and platform independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{QuestionType, ValidationMethod};
use crate::domain::{AnswerKey, Stage, StudentAnswer, SubmittedAnswer};
use crate::snapshot::{ChallengeSnapshot, QuestionSnapshot};

/// Payload for `createQuestion`. Omitted text/instructions/validationMethod
/// are resolved from the type catalogue; sub-questions attached here make
/// the question composite and fix its points to the sum of theirs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionIn {
  pub challenge_id: String,
  pub stage: Stage,
  pub phase: String,
  pub position: u32,
  #[serde(rename = "type")]
  pub type_tag: QuestionType,

  #[serde(default)]
  pub points: Option<u32>,
  #[serde(default)]
  pub time_limit: Option<u32>,
  #[serde(default)]
  pub max_attempts: Option<u32>,

  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub instructions: Option<String>,

  #[serde(default)]
  pub content: Option<Value>,
  #[serde(default)]
  pub options: Option<Value>,
  #[serde(default)]
  pub answer: Option<AnswerKey>,
  #[serde(default)]
  pub configuration: Option<Value>,

  #[serde(default)]
  pub validation_method: Option<ValidationMethod>,
  #[serde(default)]
  pub media_ids: Vec<String>,
  #[serde(default)]
  pub sub_questions: Vec<CreateSubQuestionIn>,
}

/// A sub-question created together with its parent. Challenge, stage and
/// phase are inherited from the parent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubQuestionIn {
  pub position: u32,
  #[serde(rename = "type")]
  pub type_tag: QuestionType,
  #[serde(default)]
  pub points: Option<u32>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub instructions: Option<String>,
  #[serde(default)]
  pub content: Option<Value>,
  #[serde(default)]
  pub options: Option<Value>,
  #[serde(default)]
  pub answer: Option<AnswerKey>,
  #[serde(default)]
  pub configuration: Option<Value>,
  #[serde(default)]
  pub validation_method: Option<ValidationMethod>,
  #[serde(default)]
  pub media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerIn {
  pub question_id: String,
  pub student_id: String,
  pub answer: SubmittedAnswer,
  #[serde(default)]
  pub time_spent: u32,
}

/// Question snapshot as shown to clients: the answer key never leaves the
/// server through this projection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSnapshotOut {
  pub question_id: String,
  pub stage: Stage,
  pub phase: String,
  pub position: u32,
  #[serde(rename = "type")]
  pub type_tag: QuestionType,
  pub points: u32,
  pub time_limit: u32,
  pub max_attempts: u32,
  pub text: String,
  pub instructions: String,
  pub content: Value,
  pub options: Value,
  pub configuration: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswerOut {
  pub id: String,
  pub student_id: String,
  pub question_id: String,
  pub challenge_id: String,
  pub user_answer: SubmittedAnswer,
  pub attempt_number: u32,
  pub is_correct: bool,
  pub points_earned: u32,
  pub time_spent: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback_english: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback_spanish: Option<String>,
  pub question_snapshot: QuestionSnapshotOut,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub challenge_snapshot: Option<ChallengeSnapshot>,
}

fn snapshot_out(s: &QuestionSnapshot) -> QuestionSnapshotOut {
  QuestionSnapshotOut {
    question_id: s.question_id.clone(),
    stage: s.stage,
    phase: s.phase.clone(),
    position: s.position,
    type_tag: s.type_tag,
    points: s.points,
    time_limit: s.time_limit_secs,
    max_attempts: s.max_attempts,
    text: s.text.clone(),
    instructions: s.instructions.clone(),
    content: s.content.clone(),
    options: s.options.clone(),
    configuration: s.configuration.clone(),
  }
}

/// Convert the internal `StudentAnswer` to the public DTO.
pub fn to_answer_out(a: &StudentAnswer) -> StudentAnswerOut {
  StudentAnswerOut {
    id: a.id.clone(),
    student_id: a.student_id.clone(),
    question_id: a.question_id.clone(),
    challenge_id: a.challenge_id.clone(),
    user_answer: a.user_answer.clone(),
    attempt_number: a.attempt_number,
    is_correct: a.is_correct,
    points_earned: a.points_earned,
    time_spent: a.time_spent_secs,
    feedback_english: a.feedback_english.clone(),
    feedback_spanish: a.feedback_spanish.clone(),
    question_snapshot: snapshot_out(&a.question_snapshot),
    challenge_snapshot: a.challenge_snapshot.clone(),
  }
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Challenge, QuestionRecord};
  use crate::snapshot::{snapshot_challenge, snapshot_question};

  #[test]
  fn answer_out_never_carries_the_answer_key() {
    let q = QuestionRecord {
      id: "q1".into(),
      challenge_id: "ch1".into(),
      stage: Stage::Vocabulary,
      phase: "phase_1".into(),
      position: 1,
      type_tag: QuestionType::FillBlank,
      points: 5,
      time_limit_secs: 60,
      max_attempts: 1,
      text: "Fill in the blank.".into(),
      instructions: "Type the word.".into(),
      content: Value::Null,
      options: Value::Null,
      answer: AnswerKey::Single("secret".into()),
      configuration: Value::Null,
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec![],
    };
    let c = Challenge {
      id: "ch1".into(),
      title: "Unit 1".into(),
      description: String::new(),
      stage: Stage::Vocabulary,
    };
    let a = StudentAnswer {
      id: "a1".into(),
      student_id: "s1".into(),
      question_id: "q1".into(),
      challenge_id: "ch1".into(),
      user_answer: SubmittedAnswer::Text("guess".into()),
      attempt_number: 1,
      is_correct: false,
      points_earned: 0,
      time_spent_secs: 12,
      feedback_english: None,
      feedback_spanish: None,
      question_snapshot: snapshot_question(&q).expect("snap"),
      challenge_snapshot: Some(snapshot_challenge(&c).expect("snap")),
    };

    let json = serde_json::to_string(&to_answer_out(&a)).expect("ser");
    assert!(!json.contains("secret"), "answer key leaked: {json}");
    assert!(json.contains("\"questionSnapshot\""));
  }
}
