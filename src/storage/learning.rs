//! Paper analyses, learned topics and practice progress

use std::collections::HashSet;
use rusqlite::{OptionalExtension, params};
use crate::analysis::{classify_feedback, extract_marks, extract_percentage, extract_weak_areas};
use crate::model::learning::accuracy;
use crate::model::{
    LearnedTopic, NewPaperAnalysis, PaperAnalysis, PaperReport, StudentProgress, TopicStatus, WeakTopic,
    WeakTopicProgress,
};
use crate::Result;
use super::gamification::{award_points, today};
use super::sqlite::SqliteStore;

/// Points for submitting a paper
pub const PAPER_POINTS: i64 = 10;
/// Points for a correct practice answer
pub const PRACTICE_CORRECT_POINTS: i64 = 5;
/// Points for any other practice answer
pub const PRACTICE_ATTEMPT_POINTS: i64 = 2;

/// Class recorded for progress rows of users without one
pub const UNKNOWN_CLASS: &str = "Unknown";

impl SqliteStore {
    // ========== Paper Analysis ==========

    /// Record an analysed paper and award the submission points
    pub fn save_paper_analysis(&self, paper: &NewPaperAnalysis) -> Result<i64> {
        let tx = self.immediate()?;
        tx.execute(
            r#"
            INSERT INTO paper_analysis (class, student_id, student_name, subject, student_paper, analysis_by_model)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                paper.class,
                paper.student_id,
                paper.student_name,
                paper.subject,
                paper.student_paper,
                paper.analysis_by_model,
            ],
        )?;
        let analysis_id = tx.last_insert_rowid();
        award_points(&tx, paper.student_id, PAPER_POINTS, "Paper Analysis Completed", today())?;
        tx.commit()?;
        Ok(analysis_id)
    }

    /// Analyses of a student, newest first
    pub fn analysis_history(&self, student_id: i64) -> Result<Vec<PaperAnalysis>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, class, student_id, student_name, subject, student_paper, analysis_by_model, created_at
            FROM paper_analysis WHERE student_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([student_id], |row| {
                Ok(PaperAnalysis {
                    id: row.get(0)?,
                    class: row.get(1)?,
                    student_id: row.get(2)?,
                    student_name: row.get(3)?,
                    subject: row.get(4)?,
                    student_paper: row.get(5)?,
                    analysis_by_model: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Weak areas listed in each analysis of a student, newest analysis first
    pub fn weak_topics_history(&self, student_id: i64) -> Result<Vec<WeakTopic>> {
        let mut topics = Vec::new();
        for paper in self.analysis_history(student_id)? {
            let Some(text) = paper.analysis_by_model.as_deref() else {
                continue;
            };
            for weak_area in extract_weak_areas(text) {
                topics.push(WeakTopic {
                    analysis_id: paper.id,
                    subject: paper.subject.clone(),
                    weak_area,
                    created_at: paper.created_at,
                });
            }
        }
        Ok(topics)
    }

    /// Marks and percentage quoted in each analysis, newest first
    pub fn paper_reports(&self, student_id: i64) -> Result<Vec<PaperReport>> {
        let reports = self
            .analysis_history(student_id)?
            .into_iter()
            .map(|paper| {
                let text = paper.analysis_by_model.as_deref().unwrap_or_default();
                let (obtained_marks, total_marks) = match extract_marks(text) {
                    Some((obtained, total)) => (Some(obtained), Some(total)),
                    None => (None, None),
                };
                PaperReport {
                    id: paper.id,
                    subject: paper.subject,
                    date: paper.created_at.date(),
                    obtained_marks,
                    total_marks,
                    percentage: extract_percentage(text),
                }
            })
            .collect();
        Ok(reports)
    }

    // ========== Learned Topics ==========

    /// Store what a student learned. Learning a topic again replaces the content.
    pub fn save_learned_topic(
        &self,
        student_id: i64,
        class: &str,
        subject: &str,
        topic: &str,
        content: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO learned_topics (student_id, class, subject, topic, learned_content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (student_id, subject, topic)
            DO UPDATE SET learned_content = excluded.learned_content, created_at = CURRENT_TIMESTAMP
            "#,
            params![student_id, class, subject, topic, content],
        )?;
        Ok(())
    }

    /// Topics learned in a class, newest first
    pub fn learned_topics(&self, student_id: i64, class: &str) -> Result<Vec<LearnedTopic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, class, subject, topic, learned_content, created_at
            FROM learned_topics WHERE student_id = ?1 AND class = ?2
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let rows = stmt
            .query_map(params![student_id, class], |row| {
                Ok(LearnedTopic {
                    id: row.get(0)?,
                    student_id: row.get(1)?,
                    class: row.get(2)?,
                    subject: row.get(3)?,
                    topic: row.get(4)?,
                    learned_content: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ========== Practice Progress ==========

    /// Record one practice answer from its feedback. Returns whether it counted as correct.
    pub fn save_practice_result(&self, student_id: i64, subject: &str, topic: &str, feedback: &str) -> Result<bool> {
        let correct = classify_feedback(feedback);
        let tx = self.immediate()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM student_progress WHERE student_id = ?1 AND subject = ?2 AND topic = ?3",
                params![student_id, subject, topic],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(progress_id) => {
                tx.execute(
                    r#"
                    UPDATE student_progress
                    SET attempts = attempts + 1, correct_attempts = correct_attempts + ?1,
                        last_feedback = ?2, updated_at = CURRENT_TIMESTAMP
                    WHERE id = ?3
                    "#,
                    params![correct as i64, feedback, progress_id],
                )?;
            }
            None => {
                let class: Option<String> = tx
                    .query_row("SELECT class FROM user_details WHERE id = ?1", [student_id], |row| row.get(0))
                    .optional()?
                    .flatten();
                tx.execute(
                    r#"
                    INSERT INTO student_progress (student_id, class, subject, topic, attempts, correct_attempts, last_feedback)
                    VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                    "#,
                    params![
                        student_id,
                        class.as_deref().unwrap_or(UNKNOWN_CLASS),
                        subject,
                        topic,
                        correct as i64,
                        feedback,
                    ],
                )?;
            }
        }

        let points = if correct { PRACTICE_CORRECT_POINTS } else { PRACTICE_ATTEMPT_POINTS };
        award_points(&tx, student_id, points, &format!("Practice: {}", topic), today())?;
        tx.commit()?;
        Ok(correct)
    }

    /// Practice rows of a student, most recently updated first
    pub fn student_progress(&self, student_id: i64, subject: Option<&str>) -> Result<Vec<StudentProgress>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, student_id, class, subject, topic, attempts, correct_attempts,
                   last_feedback, created_at, updated_at
            FROM student_progress
            WHERE student_id = ?1 AND (?2 IS NULL OR subject = ?2)
            ORDER BY updated_at DESC, id DESC
            "#,
        )?;
        let rows = stmt
            .query_map(params![student_id, subject], row_to_progress)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Each distinct weak area with how its practice is going
    pub fn weak_topics_with_progress(&self, student_id: i64) -> Result<Vec<WeakTopicProgress>> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for weak in self.weak_topics_history(student_id)? {
            if !seen.insert(format!("{}:{}", weak.subject, weak.weak_area)) {
                continue;
            }
            let progress = self
                .conn
                .query_row(
                    r#"
                    SELECT id, student_id, class, subject, topic, attempts, correct_attempts,
                           last_feedback, created_at, updated_at
                    FROM student_progress
                    WHERE student_id = ?1 AND subject = ?2 AND topic = ?3
                    "#,
                    params![student_id, weak.subject, weak.weak_area],
                    row_to_progress,
                )
                .optional()?;

            result.push(match progress {
                Some(p) => {
                    let acc = accuracy(p.correct_attempts, p.attempts);
                    WeakTopicProgress {
                        subject: weak.subject,
                        topic: weak.weak_area,
                        attempts: p.attempts,
                        correct_attempts: p.correct_attempts,
                        accuracy: acc,
                        last_practiced: Some(p.updated_at.date()),
                        status: TopicStatus::from_accuracy(acc),
                    }
                }
                None => WeakTopicProgress {
                    subject: weak.subject,
                    topic: weak.weak_area,
                    attempts: 0,
                    correct_attempts: 0,
                    accuracy: 0.0,
                    last_practiced: None,
                    status: TopicStatus::NotStarted,
                },
            });
        }
        Ok(result)
    }
}

fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentProgress> {
    Ok(StudentProgress {
        id: row.get(0)?,
        student_id: row.get(1)?,
        class: row.get(2)?,
        subject: row.get(3)?,
        topic: row.get(4)?,
        attempts: row.get(5)?,
        correct_attempts: row.get(6)?,
        last_feedback: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
