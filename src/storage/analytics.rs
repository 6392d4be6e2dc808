//! Class dashboards and score trends

use rusqlite::params;
use crate::model::learning::round1;
use crate::model::{ClassAnalytics, SubjectPerformance, TopPerformer, TrendPoint};
use crate::Result;
use super::sqlite::SqliteStore;

/// Number of students listed as top performers
pub const TOP_PERFORMERS: usize = 5;

impl SqliteStore {
    pub fn class_analytics(&self, class: &str) -> Result<ClassAnalytics> {
        let total_students: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM user_details WHERE role = 'student' AND class = ?1",
            [class],
            |row| row.get(0),
        )?;

        let (avg_points, avg_streak): (Option<f64>, Option<f64>) = self.conn.query_row(
            r#"
            SELECT AVG(sg.total_points), AVG(sg.current_streak)
            FROM student_gamification sg
            JOIN user_details u ON sg.student_id = u.id
            WHERE u.class = ?1
            "#,
            [class],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let recent_papers: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM paper_analysis pa
            JOIN user_details u ON pa.student_id = u.id
            WHERE u.class = ?1 AND pa.created_at > datetime('now', '-30 days')
            "#,
            [class],
            |row| row.get(0),
        )?;

        let avg_quiz_score: Option<f64> = self.conn.query_row(
            r#"
            SELECT AVG(qa.score * 100.0 / qa.total_marks)
            FROM quiz_attempts qa
            JOIN user_details u ON qa.student_id = u.id
            WHERE u.class = ?1 AND qa.score IS NOT NULL AND qa.total_marks > 0
            "#,
            [class],
            |row| row.get(0),
        )?;

        let top_performers = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT u.full_name, sg.total_points, sg.level, sg.current_streak
                FROM student_gamification sg
                JOIN user_details u ON sg.student_id = u.id
                WHERE u.class = ?1
                ORDER BY sg.total_points DESC, u.full_name
                LIMIT ?2
                "#,
            )?;
            let rows = stmt
                .query_map(params![class, TOP_PERFORMERS as i64], |row| {
                    Ok(TopPerformer {
                        full_name: row.get(0)?,
                        total_points: row.get(1)?,
                        level: row.get(2)?,
                        current_streak: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let subject_performance = {
            let mut stmt = self.conn.prepare(
                r#"
                SELECT sp.subject,
                       COUNT(DISTINCT sp.student_id),
                       SUM(sp.attempts),
                       SUM(sp.correct_attempts),
                       AVG(sp.correct_attempts * 100.0 / NULLIF(sp.attempts, 0))
                FROM student_progress sp
                JOIN user_details u ON sp.student_id = u.id
                WHERE u.class = ?1
                GROUP BY sp.subject
                ORDER BY sp.subject
                "#,
            )?;
            let rows = stmt
                .query_map([class], |row| {
                    let avg: Option<f64> = row.get(4)?;
                    Ok(SubjectPerformance {
                        subject: row.get(0)?,
                        student_count: row.get(1)?,
                        total_attempts: row.get(2)?,
                        correct_attempts: row.get(3)?,
                        avg_accuracy: avg.map(round1),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(ClassAnalytics {
            total_students,
            avg_points: round1(avg_points.unwrap_or(0.0)),
            avg_streak: round1(avg_streak.unwrap_or(0.0)),
            recent_papers,
            avg_quiz_score: round1(avg_quiz_score.unwrap_or(0.0)),
            top_performers,
            subject_performance,
        })
    }

    /// Average evaluated quiz percentage per day over the last `days` days, oldest first
    pub fn performance_trend(&self, student_id: i64, days: u32) -> Result<Vec<TrendPoint>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DATE(submitted_at) AS day, AVG(score * 100.0 / total_marks)
            FROM quiz_attempts
            WHERE student_id = ?1
              AND submitted_at > datetime('now', ?2)
              AND score IS NOT NULL AND total_marks > 0
            GROUP BY day
            ORDER BY day
            "#,
        )?;
        let window = format!("-{} days", days);
        let points = stmt
            .query_map(params![student_id, window], |row| {
                let avg: f64 = row.get(1)?;
                Ok(TrendPoint { date: row.get(0)?, avg_score: round1(avg) })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }
}
