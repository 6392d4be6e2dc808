//! Aggregated views for teachers and parents

use super::{Gamification, User};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Student overview shown to a linked parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentOverview {
    pub student: User,
    pub gamification: Option<Gamification>,
    /// Paper analyses in the last 30 days
    pub recent_papers: i64,
    /// Quiz attempts in the last 30 days
    pub recent_quizzes: i64,
    /// Mean percentage over evaluated attempts, 0 when none
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPerformer {
    pub full_name: String,
    pub total_points: i64,
    pub level: i64,
    pub current_streak: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub student_count: i64,
    pub total_attempts: i64,
    pub correct_attempts: i64,
    /// Mean per-topic accuracy; `None` when no topic has attempts
    pub avg_accuracy: Option<f64>,
}

/// Class dashboard for teachers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAnalytics {
    pub total_students: i64,
    pub avg_points: f64,
    pub avg_streak: f64,
    pub recent_papers: i64,
    pub avg_quiz_score: f64,
    pub top_performers: Vec<TopPerformer>,
    pub subject_performance: Vec<SubjectPerformance>,
}

/// Average evaluated quiz percentage on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_score: f64,
}
