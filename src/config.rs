//! Loading application configuration (judge prompts + optional question
//! bank) from TOML.
//!
//! See `AppConfig`, `JudgePrompts`, `ChallengeCfg` and `QuestionCfg` for the
//! expected schema.

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::catalog::{QuestionType, ValidationMethod};
use crate::domain::{AnswerKey, Stage};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: JudgePrompts,
  #[serde(default)]
  pub challenges: Vec<ChallengeCfg>,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Challenge entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub stage: Stage,
}

/// Question entry accepted in TOML configuration. Omitted text,
/// instructions and validation method are resolved from the type
/// catalogue when the bank is loaded into the store.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)]
  pub id: Option<String>,
  pub challenge_id: String,
  pub stage: Stage,
  pub phase: String,
  pub position: u32,
  pub type_tag: QuestionType,

  #[serde(default)]
  pub points: Option<u32>,
  #[serde(default)]
  pub time_limit_secs: Option<u32>,
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
  pub answer: AnswerKey,
  #[serde(default)]
  pub configuration: Option<Value>,

  #[serde(default)]
  pub parent_question_id: Option<String>,
  #[serde(default)]
  pub validation_method: Option<ValidationMethod>,
  #[serde(default)]
  pub media_ids: Vec<String>,
}

/// Prompts used by the external judge. Defaults produce a strict-JSON
/// bilingual verdict; override them in TOML to tune tone/rubric.
#[derive(Clone, Debug, Deserialize)]
pub struct JudgePrompts {
  pub judge_system: String,
  pub judge_user_template: String,
}

impl Default for JudgePrompts {
  fn default() -> Self {
    Self {
      judge_system: "You are a strict but encouraging language-learning evaluator. \
        Judge whether the student's answer fulfils the task. Reply ONLY with compact JSON: \
        {\"correct\": boolean, \"score\": number, \"feedback_english\": string, \"feedback_spanish\": string}. \
        'score' is 0..1. 'correct' = true if score >= 0.6. Feedback is 1-2 short sentences in each language."
        .into(),
      judge_user_template:
        "Task: {text}\nInstructions: {instructions}\nStudent answer: {answer}".into(),
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO
/// error, returns None and the server falls back to defaults + seeds.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizgrade_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizgrade_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizgrade_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
