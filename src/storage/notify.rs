//! Notifications and the parent portal

use rusqlite::{Connection, params};
use crate::model::learning::round1;
use crate::model::{LinkedStudent, Notification, NotificationType, ParentLink, StudentOverview};
use crate::Result;
use super::sqlite::{SqliteStore, parse_column, row_to_user};

/// Most notifications returned when unread ones are not filtered
pub const NOTIFICATION_LIMIT: usize = 50;

/// Default label of a parent-student link
pub const DEFAULT_RELATIONSHIP: &str = "parent";

pub(super) fn insert_notification(
    conn: &Connection,
    user_id: i64,
    title: &str,
    message: &str,
    kind: NotificationType,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, title, message, notification_type) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, title, message, kind.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SqliteStore {
    pub fn create_notification(&self, user_id: i64, title: &str, message: &str, kind: NotificationType) -> Result<i64> {
        insert_notification(&self.conn, user_id, title, message, kind)
    }

    /// Newest first: every unread notification, or the latest 50 of any state
    pub fn notifications(&self, user_id: i64, unread_only: bool) -> Result<Vec<Notification>> {
        let sql = if unread_only {
            r#"
            SELECT id, user_id, title, message, notification_type, is_read, created_at
            FROM notifications WHERE user_id = ?1 AND is_read = 0
            ORDER BY created_at DESC, id DESC
            "#
        } else {
            r#"
            SELECT id, user_id, title, message, notification_type, is_read, created_at
            FROM notifications WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 50
            "#
        };
        let mut stmt = self.conn.prepare(sql)?;
        let notifications = stmt
            .query_map([user_id], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    message: row.get(3)?,
                    notification_type: parse_column(row, 4)?,
                    is_read: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    pub fn mark_notification_read(&self, notification_id: i64) -> Result<bool> {
        let updated = self
            .conn
            .execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", [notification_id])?;
        Ok(updated > 0)
    }

    // ========== Parent Portal ==========

    /// Link a parent to a student. Linking the same pair again changes nothing.
    pub fn link_parent_student(&self, parent_id: i64, student_id: i64, relationship: Option<&str>) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO parent_students (parent_id, student_id, relationship)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (parent_id, student_id) DO NOTHING
            "#,
            params![parent_id, student_id, relationship.unwrap_or(DEFAULT_RELATIONSHIP)],
        )?;
        Ok(())
    }

    pub fn parent_students(&self, parent_id: i64) -> Result<Vec<LinkedStudent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.full_name, u.email, u.password_hash, u.role, u.class, u.created_at, ps.relationship
            FROM user_details u
            JOIN parent_students ps ON u.id = ps.student_id
            WHERE ps.parent_id = ?1
            ORDER BY u.full_name
            "#,
        )?;
        let students = stmt
            .query_map([parent_id], |row| {
                Ok(LinkedStudent { student: row_to_user(row)?, relationship: row.get(7)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }

    /// Parent links of a student
    pub fn parents_of(&self, student_id: i64) -> Result<Vec<ParentLink>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, parent_id, student_id, relationship, created_at
            FROM parent_students WHERE student_id = ?1
            ORDER BY id
            "#,
        )?;
        let links = stmt
            .query_map([student_id], |row| {
                Ok(ParentLink {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    student_id: row.get(2)?,
                    relationship: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    /// Activity summary of a student over the last 30 days
    pub fn student_overview(&self, student_id: i64) -> Result<Option<StudentOverview>> {
        let Some(student) = self.get_user(student_id)? else {
            return Ok(None);
        };

        let gamification = self.gamification(student_id)?;

        let recent_papers: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM paper_analysis WHERE student_id = ?1 AND created_at > datetime('now', '-30 days')",
            [student_id],
            |row| row.get(0),
        )?;
        let recent_quizzes: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM quiz_attempts WHERE student_id = ?1 AND submitted_at > datetime('now', '-30 days')",
            [student_id],
            |row| row.get(0),
        )?;
        let average: Option<f64> = self.conn.query_row(
            r#"
            SELECT AVG(score * 100.0 / total_marks) FROM quiz_attempts
            WHERE student_id = ?1 AND score IS NOT NULL AND total_marks > 0
            "#,
            [student_id],
            |row| row.get(0),
        )?;

        Ok(Some(StudentOverview {
            student,
            gamification,
            recent_papers,
            recent_quizzes,
            average_score: average.map(round1).unwrap_or(0.0),
        }))
    }
}
