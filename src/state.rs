//! Application state: in-memory stores, judge prompts, and question
//! creation.
//!
//! This module owns:
//!   - question/challenge/answer/media stores
//!   - the sub-question index (parent id -> ordered child ids)
//!   - the judge prompts (from TOML or defaults)
//!   - optional external judge client
//!
//! Persistence proper is out of scope; these stores exercise the core
//! contract and give the attempt ledger its linearization point (the
//! answer-store write lock).

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::catalog::{self, ValidationMethod};
use crate::config::{load_config_from_env, AppConfig, JudgePrompts, QuestionCfg};
use crate::domain::{
    is_valid_phase, AnswerKey, Challenge, MediaRef, QuestionRecord, Stage, StudentAnswer,
};
use crate::errors::CoreError;
use crate::judge::Judge;
use crate::protocol::{CreateQuestionIn, CreateSubQuestionIn};
use crate::seeds::{seed_challenge, seed_media, seed_questions};

#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<RwLock<HashMap<String, QuestionRecord>>>,
    /// parent question id -> child ids, ordered by position.
    pub children: Arc<RwLock<HashMap<String, Vec<String>>>>,
    pub challenges: Arc<RwLock<HashMap<String, Challenge>>>,
    /// (student id, question id) -> attempts in submission order.
    pub answers: Arc<RwLock<HashMap<(String, String), Vec<StudentAnswer>>>>,
    pub media: Arc<RwLock<HashMap<String, MediaRef>>>,
    pub judge: Option<Judge>,
    pub prompts: JudgePrompts,
}

impl AppState {
    /// Build state from env: load config, seed content, init the judge.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let state = Self::with_parts(load_config_from_env(), Judge::from_env());
        if let Some(j) = &state.judge {
            info!(target: "quizgrade_backend", base_url = %j.base_url, judge_model = %j.judge_model, transcribe_model = %j.transcribe_model, "External judge enabled.");
        } else {
            info!(target: "quizgrade_backend", "External judge disabled (no OPENAI_API_KEY). IA submissions will be refused as retryable.");
        }
        state
    }

    /// Build state from explicit parts (tests pass `None, None`).
    pub fn with_parts(cfg: Option<AppConfig>, judge: Option<Judge>) -> Self {
        let prompts = cfg.as_ref().map(|c| c.prompts.clone()).unwrap_or_default();

        let mut challenge_map = HashMap::<String, Challenge>::new();
        let mut question_map = HashMap::<String, QuestionRecord>::new();

        if let Some(cfg) = &cfg {
            for cc in &cfg.challenges {
                let id = cc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
                challenge_map.insert(
                    id.clone(),
                    Challenge {
                        id,
                        title: cc.title.clone(),
                        description: cc.description.clone(),
                        stage: cc.stage,
                    },
                );
            }
            for qc in &cfg.questions {
                if !challenge_map.contains_key(&qc.challenge_id) {
                    error!(target: "question", id = ?qc.id, challenge_id = %qc.challenge_id, "Skipping bank question: unknown challenge");
                    continue;
                }
                match question_from_cfg(qc) {
                    Ok(q) => {
                        question_map.insert(q.id.clone(), q);
                    }
                    Err(e) => {
                        error!(target: "question", id = ?qc.id, error = %e, "Skipping bank question");
                    }
                }
            }
        }

        // Always insert built-in seeds, but don't overwrite existing ids.
        challenge_map
            .entry(seed_challenge().id.clone())
            .or_insert_with(seed_challenge);
        for q in seed_questions() {
            question_map.entry(q.id.clone()).or_insert(q);
        }

        let mut media_map = HashMap::<String, MediaRef>::new();
        for m in seed_media() {
            media_map.insert(m.id.clone(), m);
        }

        // Child index from parent links, ordered by position; parent points
        // are the sum of their children's (never independently settable).
        let mut child_index = HashMap::<String, Vec<String>>::new();
        for q in question_map.values() {
            if let Some(parent) = &q.parent_question_id {
                child_index.entry(parent.clone()).or_default().push(q.id.clone());
            }
        }
        for (parent_id, ids) in child_index.iter_mut() {
            ids.sort_by_key(|id| question_map.get(id).map(|q| q.position).unwrap_or(u32::MAX));
            let total: u32 = ids
                .iter()
                .filter_map(|id| question_map.get(id))
                .map(|q| q.points)
                .sum();
            if let Some(parent) = question_map.get_mut(parent_id) {
                parent.points = total;
            }
        }

        // Startup inventory by stage.
        let mut count_by_stage: HashMap<Stage, usize> = HashMap::new();
        for q in question_map.values() {
            *count_by_stage.entry(q.stage).or_insert(0) += 1;
        }
        for (stage, count) in count_by_stage {
            info!(target: "question", %stage, count, "Startup question inventory");
        }

        Self {
            questions: Arc::new(RwLock::new(question_map)),
            children: Arc::new(RwLock::new(child_index)),
            challenges: Arc::new(RwLock::new(challenge_map)),
            answers: Arc::new(RwLock::new(HashMap::new())),
            media: Arc::new(RwLock::new(media_map)),
            judge,
            prompts,
        }
    }

    /// Create a question (optionally composite), applying type-catalogue
    /// defaults for any omitted text/instructions/validation method.
    #[instrument(level = "info", skip(self, input), fields(challenge_id = %input.challenge_id, type_tag = %input.type_tag))]
    pub async fn create_question(
        &self,
        input: CreateQuestionIn,
    ) -> Result<QuestionRecord, CoreError> {
        if !self.challenges.read().await.contains_key(&input.challenge_id) {
            return Err(CoreError::NotFound(format!(
                "challenge {}",
                input.challenge_id
            )));
        }
        if !is_valid_phase(&input.phase) {
            return Err(CoreError::InvalidQuestion(format!(
                "phase '{}' does not match phase_<n>",
                input.phase
            )));
        }
        self.check_position_free(&input.challenge_id, &input.phase, input.position, None)
            .await?;

        let entry = catalog::entry(input.type_tag);
        let validation = input.validation_method.unwrap_or(entry.validation);
        let has_subs = !input.sub_questions.is_empty();

        // Sibling positions must be unique too: presentation order between
        // equal positions would be arbitrary.
        let mut seen_positions = std::collections::HashSet::new();
        for sub in &input.sub_questions {
            if !seen_positions.insert(sub.position) {
                return Err(CoreError::InvalidQuestion(format!(
                    "sub-question position {} given more than once",
                    sub.position
                )));
            }
        }

        let parent_id = Uuid::new_v4().to_string();
        let mut subs = Vec::with_capacity(input.sub_questions.len());
        for sub in &input.sub_questions {
            subs.push(sub_question_record(sub, &input, &parent_id)?);
        }

        // Composite points are derived, not settable.
        let points = if has_subs {
            subs.iter().map(|s| s.points).sum()
        } else {
            input.points.unwrap_or(1)
        };

        let parent = QuestionRecord {
            id: parent_id.clone(),
            challenge_id: input.challenge_id.clone(),
            stage: input.stage,
            phase: input.phase.clone(),
            position: input.position,
            type_tag: input.type_tag,
            points,
            time_limit_secs: input.time_limit.unwrap_or(60),
            max_attempts: input.max_attempts.unwrap_or(1),
            text: input.text.clone().unwrap_or_else(|| entry.text.to_string()),
            instructions: input
                .instructions
                .clone()
                .unwrap_or_else(|| entry.instructions.to_string()),
            content: input.content.clone().unwrap_or(serde_json::Value::Null),
            options: input.options.clone().unwrap_or(serde_json::Value::Null),
            answer: resolve_answer(input.answer.clone(), validation, has_subs, input.type_tag)?,
            configuration: input
                .configuration
                .clone()
                .unwrap_or(serde_json::Value::Null),
            parent_question_id: None,
            validation_method: validation,
            media_ids: input.media_ids.clone(),
        };

        {
            let mut questions = self.questions.write().await;
            let mut children = self.children.write().await;
            questions.insert(parent.id.clone(), parent.clone());
            if has_subs {
                let mut ids: Vec<String> = subs.iter().map(|s| s.id.clone()).collect();
                ids.sort_by_key(|id| {
                    subs.iter()
                        .find(|s| &s.id == id)
                        .map(|s| s.position)
                        .unwrap_or(u32::MAX)
                });
                children.insert(parent.id.clone(), ids);
                for s in subs {
                    questions.insert(s.id.clone(), s);
                }
            }
        }

        info!(target: "question", id = %parent.id, composite = has_subs, points = parent.points, "Question created");
        Ok(parent)
    }

    async fn check_position_free(
        &self,
        challenge_id: &str,
        phase: &str,
        position: u32,
        parent: Option<&str>,
    ) -> Result<(), CoreError> {
        let questions = self.questions.read().await;
        let clash = questions.values().any(|q| {
            q.challenge_id == challenge_id
                && q.phase == phase
                && q.position == position
                && q.parent_question_id.as_deref() == parent
        });
        if clash {
            return Err(CoreError::InvalidQuestion(format!(
                "position {position} already taken in {phase}"
            )));
        }
        Ok(())
    }

    /// Insert or replace a question (bank loading, edits in tests).
    #[instrument(level = "debug", skip(self, q), fields(id = %q.id))]
    pub async fn insert_question(&self, q: QuestionRecord) {
        self.questions.write().await.insert(q.id.clone(), q);
    }

    #[instrument(level = "debug", skip(self, c), fields(id = %c.id))]
    pub async fn insert_challenge(&self, c: Challenge) {
        self.challenges.write().await.insert(c.id.clone(), c);
    }

    pub async fn insert_media(&self, m: MediaRef) {
        self.media.write().await.insert(m.id.clone(), m);
    }

    /// Read-only access to a question by id.
    pub async fn get_question(&self, id: &str) -> Option<QuestionRecord> {
        self.questions.read().await.get(id).cloned()
    }

    pub async fn get_challenge(&self, id: &str) -> Option<Challenge> {
        self.challenges.read().await.get(id).cloned()
    }

    /// Sub-questions of a parent, ordered by position.
    pub async fn get_children(&self, parent_id: &str) -> Vec<QuestionRecord> {
        let ids = self
            .children
            .read()
            .await
            .get(parent_id)
            .cloned()
            .unwrap_or_default();
        let questions = self.questions.read().await;
        ids.iter().filter_map(|id| questions.get(id).cloned()).collect()
    }

    /// Resolve attached media ids to references, skipping dangling ids.
    pub async fn media_for(&self, ids: &[String]) -> Vec<MediaRef> {
        let media = self.media.read().await;
        ids.iter().filter_map(|id| media.get(id).cloned()).collect()
    }

    pub async fn attempts_so_far(&self, student_id: &str, question_id: &str) -> u32 {
        self.answers
            .read()
            .await
            .get(&(student_id.to_string(), question_id.to_string()))
            .map(|v| v.len() as u32)
            .unwrap_or(0)
    }

    /// Assign the attempt number and persist the answer in one critical
    /// section, so attempt numbering is linearizable per (student,
    /// question) even under racing submissions.
    pub async fn record_answer(
        &self,
        mut answer: StudentAnswer,
        max_attempts: u32,
    ) -> Result<StudentAnswer, CoreError> {
        let mut answers = self.answers.write().await;
        let key = (answer.student_id.clone(), answer.question_id.clone());
        let list = answers.entry(key).or_default();
        let attempt = list.len() as u32 + 1;
        if attempt > max_attempts {
            return Err(CoreError::ValidationRefused {
                question_id: answer.question_id.clone(),
                attempt,
                max: max_attempts,
            });
        }
        answer.attempt_number = attempt;
        list.push(answer.clone());
        Ok(answer)
    }

    pub async fn answers_for(&self, student_id: &str, question_id: &str) -> Vec<StudentAnswer> {
        self.answers
            .read()
            .await
            .get(&(student_id.to_string(), question_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Re-derive a composite question's points from its children. Called
    /// whenever the sub-question set changes.
    pub async fn recompute_parent_points(&self, parent_id: &str) -> Result<u32, CoreError> {
        let ids = self
            .children
            .read()
            .await
            .get(parent_id)
            .cloned()
            .unwrap_or_default();
        let mut questions = self.questions.write().await;
        let total: u32 = ids
            .iter()
            .filter_map(|id| questions.get(id))
            .map(|q| q.points)
            .sum();
        let parent = questions
            .get_mut(parent_id)
            .ok_or_else(|| CoreError::NotFound(format!("question {parent_id}")))?;
        parent.points = total;
        Ok(total)
    }
}

fn resolve_answer(
    answer: Option<AnswerKey>,
    validation: ValidationMethod,
    has_subs: bool,
    type_tag: crate::catalog::QuestionType,
) -> Result<AnswerKey, CoreError> {
    match answer {
        Some(key) => Ok(key),
        // Judge-validated and composite questions have no deterministic key.
        None if validation == ValidationMethod::Ia || has_subs => Ok(AnswerKey::Judged),
        None => Err(CoreError::InvalidQuestion(format!(
            "type '{}' is AUTO-validated and requires an answer key",
            type_tag.as_tag()
        ))),
    }
}

fn sub_question_record(
    sub: &CreateSubQuestionIn,
    parent_input: &CreateQuestionIn,
    parent_id: &str,
) -> Result<QuestionRecord, CoreError> {
    let entry = catalog::entry(sub.type_tag);
    let validation = sub.validation_method.unwrap_or(entry.validation);
    Ok(QuestionRecord {
        id: Uuid::new_v4().to_string(),
        challenge_id: parent_input.challenge_id.clone(),
        stage: parent_input.stage,
        phase: parent_input.phase.clone(),
        position: sub.position,
        type_tag: sub.type_tag,
        points: sub.points.unwrap_or(1),
        time_limit_secs: parent_input.time_limit.unwrap_or(60),
        max_attempts: parent_input.max_attempts.unwrap_or(1),
        text: sub.text.clone().unwrap_or_else(|| entry.text.to_string()),
        instructions: sub
            .instructions
            .clone()
            .unwrap_or_else(|| entry.instructions.to_string()),
        content: sub.content.clone().unwrap_or(serde_json::Value::Null),
        options: sub.options.clone().unwrap_or(serde_json::Value::Null),
        answer: resolve_answer(sub.answer.clone(), validation, false, sub.type_tag)?,
        configuration: sub.configuration.clone().unwrap_or(serde_json::Value::Null),
        parent_question_id: Some(parent_id.to_string()),
        validation_method: validation,
        media_ids: sub.media_ids.clone(),
    })
}

fn question_from_cfg(qc: &QuestionCfg) -> Result<QuestionRecord, CoreError> {
    if !is_valid_phase(&qc.phase) {
        return Err(CoreError::InvalidQuestion(format!(
            "phase '{}' does not match phase_<n>",
            qc.phase
        )));
    }
    let entry = catalog::entry(qc.type_tag);
    let validation = qc.validation_method.unwrap_or(entry.validation);
    Ok(QuestionRecord {
        id: qc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
        challenge_id: qc.challenge_id.clone(),
        stage: qc.stage,
        phase: qc.phase.clone(),
        position: qc.position,
        type_tag: qc.type_tag,
        points: qc.points.unwrap_or(1),
        time_limit_secs: qc.time_limit_secs.unwrap_or(60),
        max_attempts: qc.max_attempts.unwrap_or(1),
        text: qc.text.clone().unwrap_or_else(|| entry.text.to_string()),
        instructions: qc
            .instructions
            .clone()
            .unwrap_or_else(|| entry.instructions.to_string()),
        content: qc.content.clone().unwrap_or(serde_json::Value::Null),
        options: qc.options.clone().unwrap_or(serde_json::Value::Null),
        answer: qc.answer.clone(),
        configuration: qc.configuration.clone().unwrap_or(serde_json::Value::Null),
        parent_question_id: qc.parent_question_id.clone(),
        validation_method: validation,
        media_ids: qc.media_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QuestionType;
    use crate::domain::Stage;

    fn base_input(tag: QuestionType, position: u32) -> CreateQuestionIn {
        CreateQuestionIn {
            challenge_id: crate::seeds::SEED_CHALLENGE_ID.into(),
            stage: Stage::Grammar,
            phase: "phase_3".into(),
            position,
            type_tag: tag,
            points: Some(5),
            time_limit: None,
            max_attempts: None,
            text: None,
            instructions: None,
            content: None,
            options: None,
            answer: Some(AnswerKey::Single("x".into())),
            configuration: None,
            validation_method: None,
            media_ids: vec![],
            sub_questions: vec![],
        }
    }

    fn sub(position: u32, points: u32) -> CreateSubQuestionIn {
        CreateSubQuestionIn {
            position,
            type_tag: QuestionType::FillBlank,
            points: Some(points),
            text: None,
            instructions: None,
            content: None,
            options: None,
            answer: Some(AnswerKey::Single(format!("a{position}"))),
            configuration: None,
            validation_method: None,
            media_ids: vec![],
        }
    }

    #[tokio::test]
    async fn creation_applies_catalogue_defaults() {
        let state = AppState::with_parts(None, None);
        let q = state
            .create_question(base_input(QuestionType::Tenses, 10))
            .await
            .expect("create");
        assert_eq!(q.text, "Identify the verb tense.");
        assert_eq!(q.validation_method, ValidationMethod::Auto);
        assert_eq!(q.time_limit_secs, 60);
        assert_eq!(q.max_attempts, 1);
    }

    #[tokio::test]
    async fn composite_points_are_the_sum_of_children() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::ReadingComprehension, 11);
        input.points = Some(999); // ignored for composites
        input.answer = None;
        input.sub_questions = vec![sub(1, 2), sub(2, 3), sub(3, 5)];
        let parent = state.create_question(input).await.expect("create");
        assert_eq!(parent.points, 10);

        let children = state.get_children(&parent.id).await;
        assert_eq!(children.len(), 3);
        assert!(children.windows(2).all(|w| w[0].position <= w[1].position));
        assert!(children.iter().all(|c| c.parent_question_id.as_deref() == Some(parent.id.as_str())));
    }

    #[tokio::test]
    async fn position_must_be_unique_within_phase() {
        let state = AppState::with_parts(None, None);
        state
            .create_question(base_input(QuestionType::Tenses, 12))
            .await
            .expect("first");
        let err = state
            .create_question(base_input(QuestionType::FillBlank, 12))
            .await
            .expect_err("second at same position");
        assert!(matches!(err, CoreError::InvalidQuestion(_)));
    }

    #[tokio::test]
    async fn sibling_positions_must_be_unique() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::ReadingComprehension, 16);
        input.answer = None;
        input.sub_questions = vec![sub(1, 2), sub(1, 3)];
        let err = state
            .create_question(input)
            .await
            .expect_err("two siblings at position 1");
        assert!(matches!(err, CoreError::InvalidQuestion(_)));
    }

    #[tokio::test]
    async fn questions_need_an_existing_challenge() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::Tenses, 17);
        input.challenge_id = "not-a-challenge".into();
        let err = state.create_question(input).await.expect_err("unknown challenge");
        assert!(matches!(err, CoreError::NotFound(_)));

        state
            .insert_challenge(Challenge {
                id: "not-a-challenge".into(),
                title: "Late arrival".into(),
                description: String::new(),
                stage: Stage::Grammar,
            })
            .await;
        let mut retry = base_input(QuestionType::Tenses, 17);
        retry.challenge_id = "not-a-challenge".into();
        state.create_question(retry).await.expect("challenge now exists");
    }

    #[tokio::test]
    async fn media_resolution_skips_dangling_ids() {
        let state = AppState::with_parts(None, None);
        state
            .insert_media(MediaRef {
                id: "m-grid".into(),
                url: "https://cdn.example.com/m-grid.png".into(),
                mime: "image/png".into(),
            })
            .await;
        let refs = state
            .media_for(&["m-grid".to_string(), "m-missing".to_string()])
            .await;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, "m-grid");
    }

    #[tokio::test]
    async fn auto_type_without_answer_key_is_rejected() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::Tenses, 13);
        input.answer = None;
        let err = state.create_question(input).await.expect_err("no key");
        assert!(matches!(err, CoreError::InvalidQuestion(_)));
    }

    #[tokio::test]
    async fn ia_type_defaults_to_judged_key() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::Debate, 14);
        input.answer = None;
        let q = state.create_question(input).await.expect("create");
        assert_eq!(q.validation_method, ValidationMethod::Ia);
        assert_eq!(q.answer, AnswerKey::Judged);
    }

    #[tokio::test]
    async fn recompute_follows_child_point_edits() {
        let state = AppState::with_parts(None, None);
        let mut input = base_input(QuestionType::ReadingComprehension, 15);
        input.answer = None;
        input.sub_questions = vec![sub(1, 2), sub(2, 3)];
        let parent = state.create_question(input).await.expect("create");
        assert_eq!(parent.points, 5);

        let mut child = state.get_children(&parent.id).await.remove(0);
        child.points = 7;
        state.insert_question(child).await;
        let total = state.recompute_parent_points(&parent.id).await.expect("recompute");
        assert_eq!(total, 10);
    }
}
