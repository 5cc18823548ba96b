//! Domain models: questions, challenges, answer payloads, student answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{QuestionType, ValidationMethod};
use crate::snapshot::{ChallengeSnapshot, QuestionSnapshot};

/// Learning stage a question belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Vocabulary,
  Grammar,
  Listening,
  Writing,
  Speaking,
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Stage::Vocabulary => "vocabulary",
      Stage::Grammar => "grammar",
      Stage::Listening => "listening",
      Stage::Writing => "writing",
      Stage::Speaking => "speaking",
    };
    f.write_str(s)
  }
}

/// Phases are ordered sub-groups within a stage: `phase_1`, `phase_2`, ...
pub fn is_valid_phase(s: &str) -> bool {
  match s.strip_prefix("phase_") {
    Some(n) => !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()),
    None => false,
  }
}

/// Ground-truth answer key, tagged by shape. The closed set of variants
/// gives the comparator exhaustiveness-checkable dispatch instead of
/// runtime shape-guessing over raw JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerKey {
  /// Single expected string (trimmed, case-insensitive compare).
  Single(String),
  /// Order-sensitive sequence (unscramble, sentence ordering).
  Ordered(Vec<String>),
  /// Unordered, deduplicated set (multi-select, word association).
  Choices(Vec<String>),
  /// Expected value per key (matching, crossword, categorize).
  Keyed(BTreeMap<String, String>),
  /// Valid words for word-bank types; scored with partial credit.
  WordList(Vec<String>),
  /// No deterministic key: correctness comes from the external judge.
  Judged,
}

/// What a learner submits. Untagged so clients send plain JSON: a string,
/// an array, an audio blob, or a keyed map. The keyed form doubles as the
/// composite answer map (sub-question id -> sub-answer).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SubmittedAnswer {
  Audio {
    #[serde(rename = "audioBase64")]
    audio_base64: String,
    mime: String,
  },
  Text(String),
  List(Vec<String>),
  Keyed(BTreeMap<String, SubmittedAnswer>),
}

impl SubmittedAnswer {
  /// Short shape label for logs and error messages.
  pub fn shape_name(&self) -> &'static str {
    match self {
      SubmittedAnswer::Audio { .. } => "audio",
      SubmittedAnswer::Text(_) => "text",
      SubmittedAnswer::List(_) => "list",
      SubmittedAnswer::Keyed(_) => "keyed",
    }
  }
}

/// Core question entity kept in the in-memory store.
///
/// `points` on a question with children is always the sum of the children's
/// points; the store recomputes it whenever sub-questions change and it is
/// never settable independently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub id: String,
  pub challenge_id: String,
  pub stage: Stage,
  pub phase: String,
  pub position: u32,
  pub type_tag: QuestionType,

  pub points: u32,
  pub time_limit_secs: u32,
  pub max_attempts: u32,

  pub text: String,
  pub instructions: String,

  // Type-specific payload. Content/options/configuration are display data
  // and stay schema-flexible; the graded surface is `answer`.
  #[serde(default)]
  pub content: Value,
  #[serde(default)]
  pub options: Value,
  pub answer: AnswerKey,
  #[serde(default)]
  pub configuration: Value,

  #[serde(default)]
  pub parent_question_id: Option<String>,
  pub validation_method: ValidationMethod,

  /// Media attached for display, referenced by stable id.
  #[serde(default)]
  pub media_ids: Vec<String>,
}

impl QuestionRecord {
  pub fn is_sub_question(&self) -> bool {
    self.parent_question_id.is_some()
  }
}

/// Parent challenge a question belongs to. Scheduling/publishing is out of
/// scope; only what the snapshot needs lives here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
  pub id: String,
  pub title: String,
  pub description: String,
  pub stage: Stage,
}

/// Resolvable media reference (resolution itself is the media store's job).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MediaRef {
  pub id: String,
  pub url: String,
  pub mime: String,
}

/// One submission attempt. Created once, immutable afterwards; the
/// snapshots are captured at creation and never refreshed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StudentAnswer {
  pub id: String,
  pub student_id: String,
  pub question_id: String,
  pub challenge_id: String,

  pub user_answer: SubmittedAnswer,
  pub attempt_number: u32,
  pub is_correct: bool,
  pub points_earned: u32,
  pub time_spent_secs: u32,

  pub feedback_english: Option<String>,
  pub feedback_spanish: Option<String>,

  pub question_snapshot: QuestionSnapshot,
  pub challenge_snapshot: Option<ChallengeSnapshot>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phase_pattern_is_enforced() {
    assert!(is_valid_phase("phase_1"));
    assert!(is_valid_phase("phase_42"));
    assert!(!is_valid_phase("phase_"));
    assert!(!is_valid_phase("phase_x"));
    assert!(!is_valid_phase("stage_1"));
    assert!(!is_valid_phase(""));
  }

  #[test]
  fn submitted_answer_parses_plain_shapes() {
    let t: SubmittedAnswer = serde_json::from_str("\"past_simple\"").expect("text");
    assert_eq!(t, SubmittedAnswer::Text("past_simple".into()));

    let l: SubmittedAnswer = serde_json::from_str(r#"["a","b"]"#).expect("list");
    assert_eq!(l, SubmittedAnswer::List(vec!["a".into(), "b".into()]));

    let k: SubmittedAnswer =
      serde_json::from_str(r#"{"q1":"yes","q2":["x","y"]}"#).expect("keyed");
    match k {
      SubmittedAnswer::Keyed(m) => {
        assert_eq!(m.len(), 2);
        assert_eq!(m["q1"], SubmittedAnswer::Text("yes".into()));
      }
      other => panic!("expected keyed, got {:?}", other),
    }
  }

  #[test]
  fn audio_shape_wins_over_keyed() {
    let a: SubmittedAnswer =
      serde_json::from_str(r#"{"audioBase64":"aGk=","mime":"audio/webm"}"#).expect("audio");
    assert_eq!(a.shape_name(), "audio");
  }

  #[test]
  fn answer_key_is_tagged_on_the_wire() {
    let key = AnswerKey::Ordered(vec!["the".into(), "cat".into(), "sleeps".into()]);
    let json = serde_json::to_string(&key).expect("ser");
    assert!(json.contains("\"kind\":\"ordered\""), "{json}");
    let back: AnswerKey = serde_json::from_str(&json).expect("de");
    assert_eq!(back, key);
  }
}
