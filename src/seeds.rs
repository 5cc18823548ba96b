//! Seed data: a built-in challenge with a few questions so the server is
//! useful even without external config.

use serde_json::json;

use crate::catalog::{QuestionType, ValidationMethod};
use crate::domain::{AnswerKey, Challenge, MediaRef, QuestionRecord, Stage};

pub const SEED_CHALLENGE_ID: &str = "seed-challenge-1";

pub fn seed_challenge() -> Challenge {
  Challenge {
    id: SEED_CHALLENGE_ID.into(),
    title: "Starter pack".into(),
    description: "Built-in questions available without configuration.".into(),
    stage: Stage::Grammar,
  }
}

pub fn seed_questions() -> Vec<QuestionRecord> {
  vec![
    QuestionRecord {
      id: "seed-q-tenses".into(),
      challenge_id: SEED_CHALLENGE_ID.into(),
      stage: Stage::Grammar,
      phase: "phase_1".into(),
      position: 1,
      type_tag: QuestionType::Tenses,
      points: 10,
      time_limit_secs: 60,
      max_attempts: 3,
      text: "Identify the verb tense.".into(),
      instructions: "Type the name of the tense used in the sentence.".into(),
      content: json!({"sentence": "She visited her grandmother last week."}),
      options: json!(["past_simple", "present_simple", "present_perfect"]),
      answer: AnswerKey::Single("past_simple".into()),
      configuration: serde_json::Value::Null,
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec![],
    },
    QuestionRecord {
      id: "seed-q-wordbox".into(),
      challenge_id: SEED_CHALLENGE_ID.into(),
      stage: Stage::Vocabulary,
      phase: "phase_1".into(),
      position: 2,
      type_tag: QuestionType::WordBox,
      points: 8,
      time_limit_secs: 120,
      max_attempts: 1,
      text: "Find the hidden words.".into(),
      instructions: "List every valid word you can find in the letter grid.".into(),
      content: json!({"grid": ["CATX", "DOGY", "BIRD", "FISH"]}),
      options: serde_json::Value::Null,
      answer: AnswerKey::WordList(vec![
        "cat".into(),
        "dog".into(),
        "bird".into(),
        "fish".into(),
      ]),
      configuration: json!({"rows": 4, "cols": 4}),
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec![],
    },
    QuestionRecord {
      id: "seed-q-debate".into(),
      challenge_id: SEED_CHALLENGE_ID.into(),
      stage: Stage::Writing,
      phase: "phase_2".into(),
      position: 1,
      type_tag: QuestionType::Debate,
      points: 20,
      time_limit_secs: 300,
      max_attempts: 1,
      text: "Should school uniforms be mandatory?".into(),
      instructions: "State your position and give at least two supporting arguments.".into(),
      content: serde_json::Value::Null,
      options: serde_json::Value::Null,
      answer: AnswerKey::Judged,
      configuration: serde_json::Value::Null,
      parent_question_id: None,
      validation_method: ValidationMethod::Ia,
      media_ids: vec![],
    },
  ]
}

/// Media references the seed questions can point at in demos and tests.
pub fn seed_media() -> Vec<MediaRef> {
  vec![MediaRef {
    id: "seed-media-1".into(),
    url: "https://cdn.example.com/media/seed-1.png".into(),
    mime: "image/png".into(),
  }]
}
