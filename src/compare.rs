//! Deterministic comparator for AUTO-validated types.
//!
//! Semantics per submitted shape:
//!   - exact string match, trimmed + case-insensitive
//!   - order-sensitive array equality (unscramble, ordering)
//!   - set equality, unordered + deduplicated (multi-select, association)
//!   - structural equality per key (matching, crossword, categorize)
//! Points are all-or-nothing at the leaf unless the catalogue declares
//! partial credit (word-bank types: proportional to valid words found,
//! capped at the declared points).

use std::collections::BTreeSet;

use crate::catalog::{self, PartialCredit};
use crate::domain::{AnswerKey, QuestionRecord, SubmittedAnswer};
use crate::errors::CoreError;
use crate::util::normalize_answer;

/// Compare a submitted answer against the question's answer key.
/// Returns `(is_correct, points_earned)`. Shape mismatches are
/// `MalformedPayload`, never a silent "incorrect".
pub fn compare(q: &QuestionRecord, submitted: &SubmittedAnswer) -> Result<(bool, u32), CoreError> {
  let malformed = |detail: String| CoreError::MalformedPayload {
    type_tag: q.type_tag.as_tag().to_string(),
    detail,
  };

  match (&q.answer, submitted) {
    (AnswerKey::Single(expected), SubmittedAnswer::Text(got)) => {
      let ok = normalize_answer(expected) == normalize_answer(got);
      Ok(score_all_or_nothing(ok, q.points))
    }

    (AnswerKey::Ordered(expected), SubmittedAnswer::List(got)) => {
      let ok = expected.len() == got.len()
        && expected
          .iter()
          .zip(got.iter())
          .all(|(e, g)| normalize_answer(e) == normalize_answer(g));
      Ok(score_all_or_nothing(ok, q.points))
    }

    (AnswerKey::Choices(expected), SubmittedAnswer::List(got)) => {
      let want: BTreeSet<String> = expected.iter().map(|s| normalize_answer(s)).collect();
      let have: BTreeSet<String> = got.iter().map(|s| normalize_answer(s)).collect();
      Ok(score_all_or_nothing(want == have, q.points))
    }

    (AnswerKey::Keyed(expected), SubmittedAnswer::Keyed(got)) => {
      if expected.len() != got.len() {
        return Ok((false, 0));
      }
      for (key, want) in expected {
        match got.get(key) {
          Some(SubmittedAnswer::Text(have)) => {
            if normalize_answer(want) != normalize_answer(have) {
              return Ok((false, 0));
            }
          }
          Some(other) => {
            return Err(malformed(format!(
              "key '{}' expects a string, got {}",
              key,
              other.shape_name()
            )))
          }
          None => return Ok((false, 0)),
        }
      }
      Ok((true, q.points))
    }

    (AnswerKey::WordList(valid), SubmittedAnswer::List(got)) => {
      Ok(score_word_bank(q, valid, got))
    }

    (AnswerKey::Judged, _) => Err(CoreError::InvalidQuestion(format!(
      "question {} is judge-validated but reached the deterministic comparator",
      q.id
    ))),

    (expected, got) => Err(malformed(format!(
      "expected {} answer, got {}",
      key_shape_name(expected),
      got.shape_name()
    ))),
  }
}

fn score_all_or_nothing(ok: bool, points: u32) -> (bool, u32) {
  if ok {
    (true, points)
  } else {
    (false, 0)
  }
}

fn score_word_bank(q: &QuestionRecord, valid: &[String], got: &[String]) -> (bool, u32) {
  let valid_set: BTreeSet<String> = valid.iter().map(|s| normalize_answer(s)).collect();
  let found: BTreeSet<String> = got
    .iter()
    .map(|s| normalize_answer(s))
    .filter(|w| valid_set.contains(w))
    .collect();

  if valid_set.is_empty() {
    return (false, 0);
  }
  let all_found = found.len() == valid_set.len();

  let entry = catalog::entry(q.type_tag);
  let earned = match entry.partial_credit {
    PartialCredit::ProportionalWords => {
      let raw = (q.points as f32) * (found.len() as f32) / (valid_set.len() as f32);
      (raw.round() as u32).min(q.points)
    }
    PartialCredit::None => {
      if all_found {
        q.points
      } else {
        0
      }
    }
  };
  (all_found, earned)
}

fn key_shape_name(key: &AnswerKey) -> &'static str {
  match key {
    AnswerKey::Single(_) => "text",
    AnswerKey::Ordered(_) => "ordered list",
    AnswerKey::Choices(_) => "list",
    AnswerKey::Keyed(_) => "keyed map",
    AnswerKey::WordList(_) => "word list",
    AnswerKey::Judged => "judged",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::{QuestionType, ValidationMethod};
  use crate::domain::Stage;
  use serde_json::Value;

  fn question(tag: QuestionType, points: u32, answer: AnswerKey) -> QuestionRecord {
    QuestionRecord {
      id: "q1".into(),
      challenge_id: "ch1".into(),
      stage: Stage::Grammar,
      phase: "phase_1".into(),
      position: 1,
      type_tag: tag,
      points,
      time_limit_secs: 60,
      max_attempts: 1,
      text: "t".into(),
      instructions: "i".into(),
      content: Value::Null,
      options: Value::Null,
      answer,
      configuration: Value::Null,
      parent_question_id: None,
      validation_method: ValidationMethod::Auto,
      media_ids: vec![],
    }
  }

  #[test]
  fn tenses_exact_match_trims_and_ignores_case() {
    let q = question(
      QuestionType::Tenses,
      10,
      AnswerKey::Single("past_simple".into()),
    );

    let (ok, pts) = compare(&q, &SubmittedAnswer::Text("past_simple".into())).expect("cmp");
    assert!(ok);
    assert_eq!(pts, 10);

    let (ok, pts) = compare(&q, &SubmittedAnswer::Text("Past_Simple ".into())).expect("cmp");
    assert!(ok, "case/whitespace variants still match");
    assert_eq!(pts, 10);

    let (ok, pts) = compare(&q, &SubmittedAnswer::Text("present_simple".into())).expect("cmp");
    assert!(!ok);
    assert_eq!(pts, 0);
  }

  #[test]
  fn unscramble_is_order_sensitive() {
    let words = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let q = question(
      QuestionType::Unscramble,
      5,
      AnswerKey::Ordered(words(&["the", "cat", "sleeps"])),
    );

    let (ok, pts) =
      compare(&q, &SubmittedAnswer::List(words(&["the", "cat", "sleeps"]))).expect("cmp");
    assert!(ok);
    assert_eq!(pts, 5);

    let (ok, pts) =
      compare(&q, &SubmittedAnswer::List(words(&["cat", "the", "sleeps"]))).expect("cmp");
    assert!(!ok);
    assert_eq!(pts, 0);
  }

  #[test]
  fn multi_select_ignores_order_and_duplicates() {
    let q = question(
      QuestionType::MultipleSelect,
      4,
      AnswerKey::Choices(vec!["red".into(), "blue".into()]),
    );

    let sub = SubmittedAnswer::List(vec!["Blue".into(), "red".into(), "blue".into()]);
    let (ok, pts) = compare(&q, &sub).expect("cmp");
    assert!(ok);
    assert_eq!(pts, 4);

    let sub = SubmittedAnswer::List(vec!["red".into()]);
    let (ok, pts) = compare(&q, &sub).expect("cmp");
    assert!(!ok);
    assert_eq!(pts, 0);
  }

  #[test]
  fn keyed_compare_checks_every_key() {
    let mut expected = std::collections::BTreeMap::new();
    expected.insert("1_across".into(), "apple".into());
    expected.insert("2_down".into(), "pear".into());
    let q = question(QuestionType::Crossword, 6, AnswerKey::Keyed(expected));

    let mut got = std::collections::BTreeMap::new();
    got.insert("1_across".into(), SubmittedAnswer::Text("APPLE".into()));
    got.insert("2_down".into(), SubmittedAnswer::Text("pear".into()));
    let (ok, pts) = compare(&q, &SubmittedAnswer::Keyed(got.clone())).expect("cmp");
    assert!(ok);
    assert_eq!(pts, 6);

    got.insert("2_down".into(), SubmittedAnswer::Text("plum".into()));
    let (ok, pts) = compare(&q, &SubmittedAnswer::Keyed(got)).expect("cmp");
    assert!(!ok);
    assert_eq!(pts, 0);
  }

  #[test]
  fn word_box_awards_proportional_credit_capped() {
    let valid = vec!["cat".into(), "dog".into(), "bird".into(), "fish".into()];
    let q = question(QuestionType::WordBox, 8, AnswerKey::WordList(valid));

    // 2 of 4 valid words, plus noise that earns nothing.
    let sub = SubmittedAnswer::List(vec!["cat".into(), "DOG".into(), "xyzzy".into()]);
    let (ok, pts) = compare(&q, &sub).expect("cmp");
    assert!(!ok, "partial finds are not fully correct");
    assert_eq!(pts, 4);

    let sub = SubmittedAnswer::List(vec![
      "cat".into(),
      "dog".into(),
      "bird".into(),
      "fish".into(),
      "cat".into(),
    ]);
    let (ok, pts) = compare(&q, &sub).expect("cmp");
    assert!(ok);
    assert_eq!(pts, 8, "duplicates never push credit past the declared points");
  }

  #[test]
  fn shape_mismatch_is_malformed_not_incorrect() {
    let q = question(
      QuestionType::Tenses,
      10,
      AnswerKey::Single("past_simple".into()),
    );
    let err = compare(&q, &SubmittedAnswer::List(vec!["past_simple".into()]))
      .expect_err("shape mismatch");
    assert!(matches!(err, CoreError::MalformedPayload { .. }));
  }
}
