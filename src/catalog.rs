//! The type catalogue: one entry per question type tag.
//!
//! Each entry fixes the defaults applied at question creation (prompt text,
//! instructions, validation method) plus the answer shape the comparator
//! expects and the partial-credit policy. Lookups are pure and total: an
//! unknown tag deserializes to `Generic` and gets generic AUTO defaults, so
//! new types can ship content before the catalogue learns about them.

use serde::{Deserialize, Serialize};

/// How an answer for this type is decided.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationMethod {
  /// Deterministic comparator over the stored answer key.
  Auto,
  /// External semantic judge (text or transcribed audio).
  Ia,
}

/// Shape of the submitted answer the deterministic comparator expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerShape {
  /// Single string, trimmed + case-insensitive.
  Exact,
  /// Array, order-sensitive (unscrambling, sentence ordering).
  OrderedList,
  /// Array, set semantics (multi-select, word association).
  UnorderedSet,
  /// Map of key -> expected string (matching, crossword, categorize).
  Keyed,
  /// Array of found words scored against a valid-word list.
  WordBank,
  /// No deterministic key; routed to the external judge.
  Judged,
}

/// Per-type partial-credit policy. Kept as data so a type can change its
/// rule without touching the comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartialCredit {
  /// All-or-nothing at the leaf.
  None,
  /// `round(points * found / total)`, capped at the declared points.
  ProportionalWords,
}

/// Question type tags. `Generic` absorbs any tag the catalogue does not
/// know yet (deliberate availability-over-strictness fallback).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  MultipleChoice,
  TrueFalse,
  FillBlank,
  Tenses,
  MultipleSelect,
  WordAssociation,
  Unscramble,
  SentenceOrdering,
  Matching,
  Categorize,
  Crossword,
  WordBox,
  AudioSpelling,
  ListeningChoice,
  ReadingComprehension,
  Debate,
  OpenAnswer,
  StoryWriting,
  ImageDescription,
  Pronunciation,
  ReadingResponse,
  #[serde(other)]
  Generic,
}

impl QuestionType {
  /// Stable snake_case tag, matching the wire encoding.
  pub fn as_tag(&self) -> &'static str {
    match self {
      QuestionType::MultipleChoice => "multiple_choice",
      QuestionType::TrueFalse => "true_false",
      QuestionType::FillBlank => "fill_blank",
      QuestionType::Tenses => "tenses",
      QuestionType::MultipleSelect => "multiple_select",
      QuestionType::WordAssociation => "word_association",
      QuestionType::Unscramble => "unscramble",
      QuestionType::SentenceOrdering => "sentence_ordering",
      QuestionType::Matching => "matching",
      QuestionType::Categorize => "categorize",
      QuestionType::Crossword => "crossword",
      QuestionType::WordBox => "word_box",
      QuestionType::AudioSpelling => "audio_spelling",
      QuestionType::ListeningChoice => "listening_choice",
      QuestionType::ReadingComprehension => "reading_comprehension",
      QuestionType::Debate => "debate",
      QuestionType::OpenAnswer => "open_answer",
      QuestionType::StoryWriting => "story_writing",
      QuestionType::ImageDescription => "image_description",
      QuestionType::Pronunciation => "pronunciation",
      QuestionType::ReadingResponse => "reading_response",
      QuestionType::Generic => "generic",
    }
  }
}

impl std::fmt::Display for QuestionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_tag())
  }
}

/// One catalogue row. `text`/`instructions` are the creation-time defaults
/// stored on the question when the caller omits them (never re-resolved).
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry {
  pub text: &'static str,
  pub instructions: &'static str,
  pub validation: ValidationMethod,
  pub shape: AnswerShape,
  pub partial_credit: PartialCredit,
}

const GENERIC_ENTRY: CatalogEntry = CatalogEntry {
  text: "Answer the question.",
  instructions: "Read the prompt carefully and submit your answer.",
  validation: ValidationMethod::Auto,
  shape: AnswerShape::Exact,
  partial_credit: PartialCredit::None,
};

/// Catalogue lookup. Total: never fails, never panics.
pub fn entry(tag: QuestionType) -> CatalogEntry {
  use AnswerShape::*;
  use PartialCredit::*;
  use QuestionType::*;
  use ValidationMethod::*;

  match tag {
    MultipleChoice => CatalogEntry {
      text: "Choose the correct answer.",
      instructions: "Select exactly one of the options.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    TrueFalse => CatalogEntry {
      text: "Is the statement true or false?",
      instructions: "Select true or false.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    FillBlank => CatalogEntry {
      text: "Fill in the blank.",
      instructions: "Type the missing word or phrase.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    Tenses => CatalogEntry {
      text: "Identify the verb tense.",
      instructions: "Type the name of the tense used in the sentence.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    MultipleSelect => CatalogEntry {
      text: "Choose all correct answers.",
      instructions: "Select every option that applies; order does not matter.",
      validation: Auto,
      shape: UnorderedSet,
      partial_credit: None,
    },
    WordAssociation => CatalogEntry {
      text: "Pick the words that belong together.",
      instructions: "Select the words associated with the prompt; order does not matter.",
      validation: Auto,
      shape: UnorderedSet,
      partial_credit: None,
    },
    Unscramble => CatalogEntry {
      text: "Unscramble the sentence.",
      instructions: "Arrange the given words into the correct order.",
      validation: Auto,
      shape: OrderedList,
      partial_credit: None,
    },
    SentenceOrdering => CatalogEntry {
      text: "Put the sentences in order.",
      instructions: "Arrange the sentences so the story reads correctly.",
      validation: Auto,
      shape: OrderedList,
      partial_credit: None,
    },
    Matching => CatalogEntry {
      text: "Match each item with its pair.",
      instructions: "For every item on the left, pick its match on the right.",
      validation: Auto,
      shape: Keyed,
      partial_credit: None,
    },
    Categorize => CatalogEntry {
      text: "Sort the words into categories.",
      instructions: "Assign each word to the category it belongs to.",
      validation: Auto,
      shape: Keyed,
      partial_credit: None,
    },
    Crossword => CatalogEntry {
      text: "Complete the crossword.",
      instructions: "Fill every numbered slot with the word matching its clue.",
      validation: Auto,
      shape: Keyed,
      partial_credit: None,
    },
    // Partial-credit rule for word_box: proportional to valid words found,
    // rounded, capped at the declared points.
    WordBox => CatalogEntry {
      text: "Find the hidden words.",
      instructions: "List every valid word you can find in the letter grid.",
      validation: Auto,
      shape: WordBank,
      partial_credit: ProportionalWords,
    },
    AudioSpelling => CatalogEntry {
      text: "Spell the word you hear.",
      instructions: "Listen to the audio and type the exact spelling.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    ListeningChoice => CatalogEntry {
      text: "Listen and choose the correct answer.",
      instructions: "Play the audio, then select one of the options.",
      validation: Auto,
      shape: Exact,
      partial_credit: None,
    },
    // Composite container: graded only through its sub-questions.
    ReadingComprehension => CatalogEntry {
      text: "Read the passage and answer the questions below.",
      instructions: "Answer every sub-question about the passage.",
      validation: Auto,
      shape: Keyed,
      partial_credit: None,
    },
    Debate => CatalogEntry {
      text: "Take a position and defend it.",
      instructions: "State your position on the topic and give at least two supporting arguments.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    OpenAnswer => CatalogEntry {
      text: "Answer in your own words.",
      instructions: "Write a short free-form answer to the prompt.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    StoryWriting => CatalogEntry {
      text: "Write a story about the images.",
      instructions: "Look at the pictures and write a short story connecting them.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    ImageDescription => CatalogEntry {
      text: "Describe the image.",
      instructions: "Describe what you see in the image in complete sentences.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    Pronunciation => CatalogEntry {
      text: "Read the sentence aloud.",
      instructions: "Record yourself reading the sentence aloud.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    ReadingResponse => CatalogEntry {
      text: "React to the passage.",
      instructions: "Write a short personal response to the passage.",
      validation: Ia,
      shape: Judged,
      partial_credit: None,
    },
    Generic => GENERIC_ENTRY,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_tag_falls_back_to_generic() {
    let tag: QuestionType = serde_json::from_str("\"holographic_karaoke\"").expect("tag");
    assert_eq!(tag, QuestionType::Generic);
    let e = entry(tag);
    assert_eq!(e.validation, ValidationMethod::Auto);
    assert_eq!(e.shape, AnswerShape::Exact);
  }

  #[test]
  fn judge_types_default_to_ia() {
    for tag in [
      QuestionType::Debate,
      QuestionType::OpenAnswer,
      QuestionType::StoryWriting,
      QuestionType::Pronunciation,
    ] {
      assert_eq!(entry(tag).validation, ValidationMethod::Ia, "{tag}");
      assert_eq!(entry(tag).shape, AnswerShape::Judged, "{tag}");
    }
  }

  #[test]
  fn tags_round_trip_through_serde() {
    let tag: QuestionType = serde_json::from_str("\"word_box\"").expect("tag");
    assert_eq!(tag, QuestionType::WordBox);
    assert_eq!(entry(tag).partial_credit, PartialCredit::ProportionalWords);
    assert_eq!(serde_json::to_string(&tag).expect("ser"), "\"word_box\"");
  }

  #[test]
  fn every_entry_has_nonempty_defaults() {
    for tag in [
      QuestionType::MultipleChoice,
      QuestionType::Tenses,
      QuestionType::WordBox,
      QuestionType::Debate,
      QuestionType::ReadingComprehension,
      QuestionType::Generic,
    ] {
      let e = entry(tag);
      assert!(!e.text.is_empty() && !e.instructions.is_empty(), "{tag}");
    }
  }
}
