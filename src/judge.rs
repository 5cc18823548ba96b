//! External-judge adapter (OpenAI-compatible API).
//!
//! We only call chat.completions (strict JSON verdicts) and
//! audio/transcriptions (spoken answers). Calls are instrumented and log
//! model names, latencies, and token usage (not contents).
//!
//! Every failure here — timeout, HTTP error, unparseable verdict — is
//! `JudgeUnavailable`: retryable by the caller, never converted into a
//! correctness verdict.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::JudgePrompts;
use crate::errors::CoreError;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct Judge {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub judge_model: String,
  pub transcribe_model: String,
}

/// What the judge returns for one submission. `score` is 0..1 of the
/// question's points; feedback comes back in both languages at once.
#[derive(Clone, Debug, Deserialize)]
pub struct JudgeVerdict {
  pub correct: bool,
  pub score: f32,
  #[serde(default)]
  pub feedback_english: String,
  #[serde(default)]
  pub feedback_spanish: String,
}

impl Judge {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let judge_model = std::env::var("OPENAI_JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let transcribe_model =
      std::env::var("OPENAI_TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, judge_model, transcribe_model })
  }

  /// Ask the judge for a verdict on a text answer.
  #[instrument(level = "info", skip(self, prompts, text, instructions, answer),
               fields(model = %self.judge_model, answer_len = answer.len()))]
  pub async fn evaluate(
    &self,
    prompts: &JudgePrompts,
    text: &str,
    instructions: &str,
    answer: &str,
  ) -> Result<JudgeVerdict, CoreError> {
    let user = fill_template(
      &prompts.judge_user_template,
      &[("text", text), ("instructions", instructions), ("answer", answer)],
    );

    let start = std::time::Instant::now();
    let mut verdict: JudgeVerdict =
      self.chat_json(&self.judge_model, &prompts.judge_system, &user, 0.2).await?;
    verdict.score = verdict.score.clamp(0.0, 1.0);
    info!(elapsed = ?start.elapsed(), correct = verdict.correct,
          score = %format!("{:.2}", verdict.score), "Judge verdict received");
    Ok(verdict)
  }

  /// Transcribe a base64 audio blob so spoken answers can be judged as text.
  #[instrument(level = "info", skip(self, audio_base64), fields(model = %self.transcribe_model, %mime, b64_len = audio_base64.len()))]
  pub async fn transcribe(&self, audio_base64: &str, mime: &str) -> Result<String, CoreError> {
    let bytes = base64::engine::general_purpose::STANDARD
      .decode(audio_base64)
      .map_err(|e| CoreError::JudgeUnavailable(format!("audio decode failed: {e}")))?;

    let ext = match mime {
      "audio/mpeg" | "audio/mp3" => "mp3",
      "audio/wav" | "audio/x-wav" => "wav",
      "audio/ogg" => "ogg",
      _ => "webm",
    };
    let part = reqwest::multipart::Part::bytes(bytes)
      .file_name(format!("answer.{ext}"))
      .mime_str(mime)
      .map_err(|e| CoreError::JudgeUnavailable(format!("bad mime '{mime}': {e}")))?;
    let form = reqwest::multipart::Form::new()
      .text("model", self.transcribe_model.clone())
      .part("file", part);

    let url = format!("{}/audio/transcriptions", self.base_url);
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "quizgrade-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form)
      .send()
      .await
      .map_err(|e| CoreError::JudgeUnavailable(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(CoreError::JudgeUnavailable(format!("transcribe HTTP {status}: {msg}")));
    }

    #[derive(Deserialize)]
    struct Transcription {
      text: String,
    }
    let t: Transcription = res
      .json()
      .await
      .map_err(|e| CoreError::JudgeUnavailable(e.to_string()))?;
    Ok(t.text.trim().to_string())
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, CoreError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "quizgrade-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| CoreError::JudgeUnavailable(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(CoreError::JudgeUnavailable(format!("judge HTTP {status}: {msg}")));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| CoreError::JudgeUnavailable(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Judge usage");
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| {
      CoreError::JudgeUnavailable(format!(
        "verdict parse error: {e} (body: {})",
        trunc_for_log(&text, 200)
      ))
    })
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq {
  role: String,
  content: String,
}
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  r#type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)]
  prompt_tokens: Option<u32>,
  #[serde(default)]
  completion_tokens: Option<u32>,
  #[serde(default)]
  total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
