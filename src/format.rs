//! Client-facing projection of questions.
//!
//! Formatting is a pure function over its inputs: it never mutates the
//! record, never exposes the answer key, and yields byte-identical output
//! for identical inputs. Media is merged in by stable id rather than
//! duplicating payloads; composite questions carry their sub-questions
//! recursively.

use serde::Serialize;
use serde_json::Value;

use crate::catalog::QuestionType;
use crate::domain::{MediaRef, QuestionRecord, Stage};

/// Everything the formatter needs for one question, gathered by the caller
/// (the store walk lives in `routes`; this stays a pure projection).
#[derive(Clone, Debug)]
pub struct FormatInput {
  pub question: QuestionRecord,
  pub media: Vec<MediaRef>,
  pub children: Vec<FormatInput>,
}

/// Type-specific display shape. `type` keys the client's renderer; the
/// answer key never appears here.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: String,
  pub challenge_id: String,
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
  #[serde(skip_serializing_if = "Value::is_null")]
  pub content: Value,
  #[serde(skip_serializing_if = "Value::is_null")]
  pub options: Value,
  #[serde(skip_serializing_if = "Value::is_null")]
  pub configuration: Value,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub media: Vec<MediaRef>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub sub_questions: Vec<QuestionView>,
}

/// Project a question (and its sub-questions) into the display shape.
pub fn format_question(input: &FormatInput) -> QuestionView {
  let q = &input.question;
  QuestionView {
    id: q.id.clone(),
    challenge_id: q.challenge_id.clone(),
    stage: q.stage,
    phase: q.phase.clone(),
    position: q.position,
    type_tag: q.type_tag,
    points: q.points,
    time_limit: q.time_limit_secs,
    max_attempts: q.max_attempts,
    text: q.text.clone(),
    instructions: q.instructions.clone(),
    content: q.content.clone(),
    options: q.options.clone(),
    configuration: q.configuration.clone(),
    media: input.media.clone(),
    sub_questions: input.children.iter().map(format_question).collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::ValidationMethod;
  use crate::domain::AnswerKey;
  use serde_json::json;

  fn sample_input() -> FormatInput {
    let question = QuestionRecord {
      id: "q1".into(),
      challenge_id: "ch1".into(),
      stage: Stage::Vocabulary,
      phase: "phase_1".into(),
      position: 1,
      type_tag: QuestionType::WordBox,
      points: 8,
      time_limit_secs: 120,
      max_attempts: 1,
      text: "Find the hidden words.".into(),
      instructions: "List every valid word.".into(),
      content: json!({"grid": ["CATX", "DOGY"]}),
      options: Value::Null,
      answer: AnswerKey::WordList(vec!["cat".into(), "dog".into()]),
      configuration: json!({"rows": 2, "cols": 4}),
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec!["m1".into()],
    };
    FormatInput {
      question,
      media: vec![MediaRef {
        id: "m1".into(),
        url: "https://cdn.example.com/m1.png".into(),
        mime: "image/png".into(),
      }],
      children: vec![],
    }
  }

  #[test]
  fn formatting_never_exposes_the_answer() {
    let view = format_question(&sample_input());
    let json = serde_json::to_string(&view).expect("ser");
    assert!(!json.contains("cat\",\"dog"), "answer words leaked: {json}");
    assert!(!json.contains("answer"), "answer field leaked: {json}");
    assert!(json.contains("\"type\":\"word_box\""));
    assert!(json.contains("https://cdn.example.com/m1.png"));
  }

  #[test]
  fn formatting_is_idempotent_and_does_not_mutate() {
    let input = sample_input();
    let before = serde_json::to_value(&input.question).expect("ser");
    let first = serde_json::to_string(&format_question(&input)).expect("ser");
    let second = serde_json::to_string(&format_question(&input)).expect("ser");
    assert_eq!(first, second, "same inputs must yield byte-identical output");
    let after = serde_json::to_value(&input.question).expect("ser");
    assert_eq!(before, after, "input record must not be mutated");
  }

  #[test]
  fn composite_views_nest_their_sub_questions() {
    let mut parent = sample_input();
    let mut child = sample_input();
    child.question.id = "q2".into();
    child.question.parent_question_id = Some("q1".into());
    child.media.clear();
    child.question.media_ids.clear();
    parent.children.push(child);

    let view = format_question(&parent);
    assert_eq!(view.sub_questions.len(), 1);
    assert_eq!(view.sub_questions[0].id, "q2");
  }
}
