//! Curriculum, paper analysis, practice progress and gamification records

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A row of `curriculum`, unique per (class, subject)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: i64,
    pub class: String,
    pub subject: String,
    pub curriculum: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A row of `paper_analysis`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperAnalysis {
    pub id: i64,
    pub class: String,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub subject: String,
    pub student_paper: Option<String>,
    pub analysis_by_model: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Data needed to record a paper analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaperAnalysis {
    pub class: String,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub subject: String,
    pub student_paper: String,
    pub analysis_by_model: String,
}

/// A weak area pulled out of one paper analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakTopic {
    pub analysis_id: i64,
    pub subject: String,
    pub weak_area: String,
    pub created_at: NaiveDateTime,
}

/// Marks and percentage extracted from an analysis text; `None` when absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperReport {
    pub id: i64,
    pub subject: String,
    pub date: NaiveDate,
    pub obtained_marks: Option<String>,
    pub total_marks: Option<String>,
    pub percentage: Option<String>,
}

/// A row of `student_progress`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProgress {
    pub id: i64,
    pub student_id: i64,
    pub class: String,
    pub subject: String,
    pub topic: String,
    pub attempts: i64,
    pub correct_attempts: i64,
    pub last_feedback: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StudentProgress {
    /// Percentage of correct attempts, rounded to one decimal
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct_attempts, self.attempts)
    }
}

pub(crate) fn accuracy(correct: i64, attempts: i64) -> f64 {
    if attempts <= 0 {
        return 0.0;
    }
    round1(correct as f64 / attempts as f64 * 100.0)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Practice status of a weak topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicStatus {
    #[serde(rename = "Improving")]
    Improving,
    #[serde(rename = "Needs Practice")]
    NeedsPractice,
    #[serde(rename = "Not Started")]
    NotStarted,
}

impl TopicStatus {
    /// Accuracy of 70% or more counts as improving
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 70.0 {
            TopicStatus::Improving
        } else {
            TopicStatus::NeedsPractice
        }
    }
}

/// A weak topic with its practice record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakTopicProgress {
    pub subject: String,
    pub topic: String,
    pub attempts: i64,
    pub correct_attempts: i64,
    pub accuracy: f64,
    /// `None` when never practiced
    pub last_practiced: Option<NaiveDate>,
    pub status: TopicStatus,
}

/// A row of `learned_topics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedTopic {
    pub id: i64,
    pub student_id: i64,
    pub class: String,
    pub subject: String,
    pub topic: String,
    pub learned_content: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A row of `student_gamification`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gamification {
    pub id: i64,
    pub student_id: i64,
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub level: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A row of `badges`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub student_id: i64,
    pub badge_name: String,
    pub badge_description: Option<String>,
    pub badge_icon: Option<String>,
    pub earned_at: NaiveDateTime,
}

/// Outcome of awarding points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsAward {
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub level: i64,
    /// Badges earned by this award
    pub new_badges: Vec<String>,
}
