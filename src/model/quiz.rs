//! Quizzes, questions and attempts
//!
//! The `options` and `answers` columns are JSON text in SQLite. At the Rust
//! boundary they are typed: a question is a [`QuestionSpec`] variant per
//! `question_type`, and an attempt's answers are a [`QuizAnswers`] map. Both
//! are validated before they are written.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Question kinds, CHECK-constrained in `quiz_questions.question_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    ShortAnswer,
    LongAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::LongAnswer => "long_answer",
        }
    }

    pub fn all() -> &'static [QuestionType] {
        &[QuestionType::Mcq, QuestionType::ShortAnswer, QuestionType::LongAnswer]
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mcq" => Ok(QuestionType::Mcq),
            "short_answer" => Ok(QuestionType::ShortAnswer),
            "long_answer" => Ok(QuestionType::LongAnswer),
            _ => Err(Error::InvalidValue(format!("Unknown question type: {}", s))),
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of a question, tagged by its type.
///
/// Only multiple-choice questions carry options; their correct answer must be
/// one of the options (compared case-insensitively).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSpec {
    Mcq { options: Vec<String>, correct_answer: String },
    ShortAnswer { correct_answer: String },
    LongAnswer { correct_answer: String },
}

impl QuestionSpec {
    pub fn mcq<S: Into<String>>(options: impl IntoIterator<Item = S>, correct_answer: impl Into<String>) -> Self {
        QuestionSpec::Mcq {
            options: options.into_iter().map(Into::into).collect(),
            correct_answer: correct_answer.into(),
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionSpec::Mcq { .. } => QuestionType::Mcq,
            QuestionSpec::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionSpec::LongAnswer { .. } => QuestionType::LongAnswer,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionSpec::Mcq { options, .. } => Some(options),
            _ => None,
        }
    }

    pub fn correct_answer(&self) -> &str {
        match self {
            QuestionSpec::Mcq { correct_answer, .. }
            | QuestionSpec::ShortAnswer { correct_answer }
            | QuestionSpec::LongAnswer { correct_answer } => correct_answer,
        }
    }

    /// Check the variant's own invariants
    pub fn validate(&self) -> Result<()> {
        if let QuestionSpec::Mcq { options, correct_answer } = self {
            if options.len() < 2 {
                return Err(Error::InvalidQuestion(format!(
                    "mcq needs at least 2 options, got {}",
                    options.len()
                )));
            }
            if options.iter().any(|o| o.trim().is_empty()) {
                return Err(Error::InvalidQuestion("mcq option is empty".to_string()));
            }
            if !options.iter().any(|o| o.eq_ignore_ascii_case(correct_answer)) {
                return Err(Error::InvalidQuestion(format!(
                    "correct answer '{}' is not one of the options",
                    correct_answer
                )));
            }
        }
        Ok(())
    }

    /// JSON text for the `options` column, `None` for non-mcq questions
    pub fn options_json(&self) -> Result<Option<String>> {
        self.options()
            .map(|opts| serde_json::to_string(opts).map_err(Into::into))
            .transpose()
    }

    /// Rebuild a spec from the three stored columns
    pub fn from_columns(
        question_type: QuestionType,
        options_json: Option<&str>,
        correct_answer: Option<String>,
    ) -> Result<Self> {
        let correct_answer = correct_answer.unwrap_or_default();
        Ok(match question_type {
            QuestionType::Mcq => {
                let options = match options_json {
                    Some(json) => serde_json::from_str(json)?,
                    None => Vec::new(),
                };
                QuestionSpec::Mcq { options, correct_answer }
            }
            QuestionType::ShortAnswer => QuestionSpec::ShortAnswer { correct_answer },
            QuestionType::LongAnswer => QuestionSpec::LongAnswer { correct_answer },
        })
    }

    /// Whether `answer` picks the correct option. Always false for free-text questions.
    pub fn is_correct_choice(&self, answer: &str) -> bool {
        match self {
            QuestionSpec::Mcq { correct_answer, .. } => answer.trim().eq_ignore_ascii_case(correct_answer.trim()),
            _ => false,
        }
    }
}

/// A question to be inserted with a new quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question_text: String,
    pub marks: i64,
    pub spec: QuestionSpec,
}

impl NewQuestion {
    pub fn new(question_text: impl Into<String>, marks: i64, spec: QuestionSpec) -> Self {
        Self { question_text: question_text.into(), marks, spec }
    }

    pub fn validate(&self) -> Result<()> {
        if self.question_text.trim().is_empty() {
            return Err(Error::InvalidQuestion("question text is empty".to_string()));
        }
        if self.marks <= 0 {
            return Err(Error::InvalidQuestion(format!("marks must be positive, got {}", self.marks)));
        }
        self.spec.validate()
    }
}

/// Data needed to publish a quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuiz {
    pub teacher_id: i64,
    pub class: String,
    pub subject: String,
    pub title: String,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub deadline: Option<NaiveDateTime>,
    pub questions: Vec<NewQuestion>,
}

impl NewQuiz {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidValue("quiz title is empty".to_string()));
        }
        if self.duration_minutes <= 0 {
            return Err(Error::InvalidValue(format!(
                "quiz duration must be positive, got {}",
                self.duration_minutes
            )));
        }
        if self.total_marks < 0 {
            return Err(Error::InvalidValue(format!(
                "quiz total marks must not be negative, got {}",
                self.total_marks
            )));
        }
        for (i, question) in self.questions.iter().enumerate() {
            question
                .validate()
                .map_err(|e| Error::InvalidQuestion(format!("question {}: {}", i + 1, e)))?;
        }
        Ok(())
    }
}

/// A row of `quizzes`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub teacher_id: i64,
    pub class: String,
    pub subject: String,
    pub title: String,
    pub duration_minutes: i64,
    pub total_marks: i64,
    pub deadline: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Quiz listing entry with the authoring teacher's name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizListing {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub teacher_name: String,
}

/// A row of `quiz_questions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub spec: QuestionSpec,
    pub marks: i64,
    pub order_num: i64,
    pub created_at: NaiveDateTime,
}

/// Answers of one attempt, keyed by zero-based question index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswers(BTreeMap<String, String>);

impl QuizAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, index: usize, text: impl Into<String>) -> Self {
        self.0.insert(index.to_string(), text.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(&index.to_string()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every key must be a question index below `question_count`
    pub fn validate(&self, question_count: usize) -> Result<()> {
        for key in self.0.keys() {
            let index: usize = key
                .parse()
                .map_err(|_| Error::InvalidValue(format!("answer key '{}' is not a question index", key)))?;
            if index >= question_count {
                return Err(Error::InvalidValue(format!(
                    "answer for question {} but quiz has {} questions",
                    index, question_count
                )));
            }
        }
        Ok(())
    }
}

/// A row of `quiz_attempts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub answers: QuizAnswers,
    /// `None` until evaluated
    pub score: Option<f64>,
    pub total_marks: i64,
    /// Seconds
    pub time_taken: i64,
    pub submitted_at: NaiveDateTime,
    pub evaluated_at: Option<NaiveDateTime>,
    pub feedback: Option<String>,
}

impl QuizAttempt {
    pub fn is_evaluated(&self) -> bool {
        self.score.is_some()
    }
}

/// Attempt joined with its quiz title and subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptListing {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub title: String,
    pub subject: String,
}

/// One evaluated attempt in a student's quiz summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummaryRow {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub obtained_marks: f64,
    pub total_marks: i64,
    pub percentage: f64,
    pub date: NaiveDate,
    /// Formatted as `"{m}m {s}s"`
    pub time_taken: String,
}

/// Format seconds the way quiz summaries display them
pub fn format_time_taken(seconds: i64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
