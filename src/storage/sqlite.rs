//! SQLite storage implementation
//!
//! Connection management, users, curricula and maintenance queries. The other
//! table groups add their operations to [`SqliteStore`] from sibling modules.

use std::path::Path;
use std::str::FromStr;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use crate::model::{Curriculum, NewUser, Role, StudentSummary, User};
use crate::{Error, Result};
use super::migrations::{self, Migration};
use super::schema;

/// Placeholder text for subjects added before a teacher supplies content
pub const PENDING_CURRICULUM: &str = "Curriculum pending - Please contact your teacher to add content.";

/// SQLite-backed store for the education schema
pub struct SqliteStore {
    pub(super) conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist) and apply pending migrations
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::open_unmigrated(path)?;
        store.migrate()?;
        Ok(store)
    }

    /// Open a database file without touching its schema
    pub fn open_unmigrated(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(())
    }

    /// Apply pending migrations, returning the versions applied
    pub fn migrate(&self) -> Result<Vec<u32>> {
        migrations::migrate(&self.conn)
    }

    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    pub fn pending_migrations(&self) -> Result<Vec<&'static Migration>> {
        migrations::pending(&self.conn)
    }

    /// Whether foreign key enforcement is on for this connection
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: i64 = self.conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
        Ok(enabled == 1)
    }

    /// Raw connection, for callers issuing their own SQL
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction that takes the write lock immediately
    pub(super) fn immediate(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?)
    }

    // ========== User Operations ==========

    /// Create a user. Students also get their gamification row.
    pub fn create_user(&self, user: &NewUser) -> Result<i64> {
        let tx = self.immediate()?;
        tx.execute(
            r#"
            INSERT INTO user_details (full_name, email, password_hash, role, class)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![user.full_name, user.email, user.password_hash, user.role.as_str(), user.class],
        )?;
        let user_id = tx.last_insert_rowid();

        if user.role == Role::Student {
            tx.execute(
                "INSERT INTO student_gamification (student_id) VALUES (?1) ON CONFLICT (student_id) DO NOTHING",
                [user_id],
            )?;
        }
        tx.commit()?;
        tracing::debug!("Created {} user {} ({})", user.role, user_id, user.email);
        Ok(user_id)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, full_name, email, password_hash, role, class, created_at FROM user_details WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, full_name, email, password_hash, role, class, created_at FROM user_details WHERE email = ?1",
                [email],
                row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Students of a class, ordered by name
    pub fn students_in_class(&self, class: &str) -> Result<Vec<StudentSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, full_name, email, class FROM user_details
            WHERE role = 'student' AND class = ?1
            ORDER BY full_name
            "#,
        )?;
        let students = stmt
            .query_map([class], row_to_student_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }

    /// Find students by exact email, or else by class. Empty when neither is given.
    pub fn search_students(&self, email: Option<&str>, class: Option<&str>) -> Result<Vec<StudentSummary>> {
        let (sql, key) = match (email, class) {
            (Some(email), _) => (
                "SELECT id, full_name, email, class FROM user_details WHERE email = ?1 AND role = 'student'",
                email,
            ),
            (None, Some(class)) => (
                "SELECT id, full_name, email, class FROM user_details WHERE class = ?1 AND role = 'student'",
                class,
            ),
            (None, None) => return Ok(Vec::new()),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let students = stmt
            .query_map([key], row_to_student_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }

    /// Delete a user; dependent rows go with it through cascading foreign keys
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM user_details WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    // ========== Curriculum Operations ==========

    /// Insert or replace the curriculum of a (class, subject)
    pub fn save_curriculum(&self, class: &str, subject: &str, text: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO curriculum (class, subject, curriculum, updated_at)
            VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT (class, subject)
            DO UPDATE SET curriculum = excluded.curriculum, updated_at = CURRENT_TIMESTAMP
            "#,
            params![class, subject, text],
        )?;
        Ok(())
    }

    pub fn get_curriculum(&self, class: &str, subject: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT curriculum FROM curriculum WHERE class = ?1 AND subject = ?2",
                [class, subject],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Subjects with a curriculum for a class, sorted
    pub fn subjects_for_class(&self, class: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT subject FROM curriculum WHERE class = ?1 ORDER BY subject")?;
        let subjects = stmt
            .query_map([class], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(subjects)
    }

    pub fn all_curricula(&self) -> Result<Vec<Curriculum>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, class, subject, curriculum, created_at, updated_at FROM curriculum ORDER BY class, subject",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Curriculum {
                    id: row.get(0)?,
                    class: row.get(1)?,
                    subject: row.get(2)?,
                    curriculum: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Register a subject with placeholder content. Returns false if it already exists.
    pub fn add_subject_for_class(&self, class: &str, subject: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT INTO curriculum (class, subject, curriculum, updated_at)
            VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT (class, subject) DO NOTHING
            "#,
            params![class, subject, PENDING_CURRICULUM],
        )?;
        Ok(inserted > 0)
    }

    // ========== Maintenance ==========

    /// Count rows of one schema table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        if !schema::TABLES.contains(&table) {
            return Err(Error::InvalidValue(format!("Unknown table: {}", table)));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::with_capacity(schema::TABLES.len());
        for table in schema::TABLES {
            tables.push((*table, self.count_rows(table)?));
        }
        Ok(DbStats { schema_version: self.schema_version()?, tables })
    }
}

/// Read an enumerated text column into its Rust enum
pub(super) fn parse_column<T: FromStr<Err = Error>>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Helper to convert a row to a User
pub(super) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_column(row, 4)?,
        class: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn row_to_student_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentSummary> {
    Ok(StudentSummary {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        class: row.get(3)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub schema_version: u32,
    /// Row count per table, in schema order
    pub tables: Vec<(&'static str, usize)>,
}

impl DbStats {
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(name, _)| *name == table).map(|(_, n)| *n)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Schema version: {}", self.schema_version)?;
        for (table, count) in &self.tables {
            writeln!(f, "  {}: {}", table, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntegrityViolation;

    pub(crate) fn student(store: &SqliteStore, email: &str, class: &str) -> i64 {
        store
            .create_user(&NewUser::new("Student", email, "hash", Role::Student).in_class(class))
            .unwrap()
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn test_user_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .create_user(&NewUser::new("Ada Lovelace", "ada@school.test", "h", Role::Teacher))
            .unwrap();

        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.role, Role::Teacher);
        assert_eq!(user.class, None);

        let by_email = store.get_user_by_email("ada@school.test").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert!(store.get_user_by_email("nobody@school.test").unwrap().is_none());
    }

    #[test]
    fn test_student_gets_gamification_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = student(&store, "s1@school.test", "10A");
        let teacher = store
            .create_user(&NewUser::new("T", "t@school.test", "h", Role::Teacher))
            .unwrap();

        let game = store.gamification(id).unwrap().unwrap();
        assert_eq!(game.total_points, 0);
        assert_eq!(game.level, 1);
        assert!(store.gamification(teacher).unwrap().is_none());
    }

    #[test]
    fn test_invalid_role_rejected_by_storage() {
        let store = SqliteStore::open_in_memory().unwrap();
        for role in ["admin", "Teacher", ""] {
            let err: Error = store
                .connection()
                .execute(
                    "INSERT INTO user_details (full_name, email, password_hash, role) VALUES ('x', ?1, 'h', ?2)",
                    params![format!("{}@x.test", role), role],
                )
                .unwrap_err()
                .into();
            assert_eq!(err.integrity_violation(), Some(IntegrityViolation::Check));
        }
        assert_eq!(store.count_rows("user_details").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_email_is_unique_violation() {
        let store = SqliteStore::open_in_memory().unwrap();
        student(&store, "dup@school.test", "10A");
        let err = store
            .create_user(&NewUser::new("Other", "dup@school.test", "h", Role::Parent))
            .unwrap_err();
        assert_eq!(err.integrity_violation(), Some(IntegrityViolation::Unique));
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_second_gamification_row_is_unique_violation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = student(&store, "s1@school.test", "10A");
        let err: Error = store
            .connection()
            .execute("INSERT INTO student_gamification (student_id) VALUES (?1)", [id])
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(IntegrityViolation::Unique));
        assert_eq!(store.count_rows("student_gamification").unwrap(), 1);
    }

    #[test]
    fn test_missing_name_is_not_null_violation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err: Error = store
            .connection()
            .execute(
                "INSERT INTO user_details (full_name, email, password_hash, role) VALUES (NULL, 'x@x.test', 'h', 'student')",
                [],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(IntegrityViolation::NotNull));
        assert_eq!(store.count_rows("user_details").unwrap(), 0);
    }

    #[test]
    fn test_students_in_class_and_search() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_user(&NewUser::new("Zed", "zed@school.test", "h", Role::Student).in_class("10A"))
            .unwrap();
        store
            .create_user(&NewUser::new("Amy", "amy@school.test", "h", Role::Student).in_class("10A"))
            .unwrap();
        store
            .create_user(&NewUser::new("Bob", "bob@school.test", "h", Role::Student).in_class("9B"))
            .unwrap();

        let roster = store.students_in_class("10A").unwrap();
        let names: Vec<_> = roster.iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);

        assert_eq!(store.search_students(Some("bob@school.test"), None).unwrap().len(), 1);
        assert_eq!(store.search_students(None, Some("10A")).unwrap().len(), 2);
        assert!(store.search_students(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_curriculum_upsert_keeps_one_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_curriculum("10A", "Math", "Algebra").unwrap();
        store.save_curriculum("10A", "Math", "Algebra, Geometry").unwrap();
        store.save_curriculum("10A", "Physics", "Motion").unwrap();

        assert_eq!(store.get_curriculum("10A", "Math").unwrap().as_deref(), Some("Algebra, Geometry"));
        assert_eq!(store.count_rows("curriculum").unwrap(), 2);
        assert_eq!(store.subjects_for_class("10A").unwrap(), vec!["Math", "Physics"]);

        let err: Error = store
            .connection()
            .execute(
                "INSERT INTO curriculum (class, subject, curriculum) VALUES ('10A', 'Math', 'dup')",
                [],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(IntegrityViolation::Unique));
    }

    #[test]
    fn test_add_subject_for_class() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.add_subject_for_class("9B", "Biology").unwrap());
        assert!(!store.add_subject_for_class("9B", "Biology").unwrap());
        assert_eq!(store.get_curriculum("9B", "Biology").unwrap().as_deref(), Some(PENDING_CURRICULUM));

        let all = store.all_curricula().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "Biology");
    }

    #[test]
    fn test_delete_user_leaves_no_dangling_rows() {
        use crate::model::{NewPaperAnalysis, NewQuestion, NewQuiz, QuestionSpec, QuizAnswers};

        let store = SqliteStore::open_in_memory().unwrap();
        let teacher = store
            .create_user(&NewUser::new("T", "t@school.test", "h", Role::Teacher))
            .unwrap();
        let parent = store
            .create_user(&NewUser::new("P", "p@home.test", "h", Role::Parent))
            .unwrap();
        let pupil = student(&store, "s@school.test", "4D");
        let other = student(&store, "o@school.test", "4D");

        let quiz_id = store
            .create_quiz(&NewQuiz {
                teacher_id: teacher,
                class: "4D".to_string(),
                subject: "Math".to_string(),
                title: "Warmup".to_string(),
                duration_minutes: 5,
                total_marks: 1,
                deadline: None,
                questions: vec![NewQuestion::new("1+1?", 1, QuestionSpec::mcq(["1", "2"], "2"))],
            })
            .unwrap();
        for id in [pupil, other] {
            store
                .submit_quiz_attempt(quiz_id, id, &QuizAnswers::new().answer(0, "2"), 20)
                .unwrap();
        }
        store
            .save_paper_analysis(&NewPaperAnalysis {
                class: "4D".to_string(),
                student_id: pupil,
                student_name: None,
                subject: "Math".to_string(),
                student_paper: "paper".to_string(),
                analysis_by_model: "analysis".to_string(),
            })
            .unwrap();
        store.save_practice_result(pupil, "Math", "Sums", "Correct").unwrap();
        store.save_learned_topic(pupil, "4D", "Math", "Sums", "notes").unwrap();
        store.add_points(pupil, 200, "bonus").unwrap();
        store.link_parent_student(parent, pupil, None).unwrap();
        store.link_parent_student(parent, other, None).unwrap();

        assert!(store.delete_user(pupil).unwrap());
        let owned_by = |table: &str, column: &str, id: i64| -> i64 {
            store
                .connection()
                .query_row(&format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, column), [id], |row| row.get(0))
                .unwrap()
        };
        for (table, column) in [
            ("paper_analysis", "student_id"),
            ("student_progress", "student_id"),
            ("learned_topics", "student_id"),
            ("student_gamification", "student_id"),
            ("badges", "student_id"),
            ("quiz_attempts", "student_id"),
            ("notifications", "user_id"),
            ("parent_students", "student_id"),
        ] {
            assert_eq!(owned_by(table, column, pupil), 0, "dangling rows in {}", table);
        }
        assert_eq!(store.count_rows("quiz_attempts").unwrap(), 1);
        assert_eq!(store.parent_students(parent).unwrap().len(), 1);

        // Parent side and teacher side
        assert!(store.delete_user(parent).unwrap());
        assert_eq!(store.count_rows("parent_students").unwrap(), 0);
        assert!(store.delete_user(teacher).unwrap());
        assert_eq!(store.count_rows("quizzes").unwrap(), 0);
        assert_eq!(store.count_rows("quiz_questions").unwrap(), 0);
        assert_eq!(store.count_rows("quiz_attempts").unwrap(), 0);
        assert!(!store.delete_user(teacher).unwrap());
    }

    #[test]
    fn test_reopen_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edutrack.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            student(&store, "keep@school.test", "1A");
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.migrate().unwrap().is_empty());
        assert!(store.pending_migrations().unwrap().is_empty());
        assert_eq!(store.schema_version().unwrap(), migrations::latest_version());
        assert!(store.get_user_by_email("keep@school.test").unwrap().is_some());
    }

    #[test]
    fn test_open_unmigrated_reports_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_unmigrated(&dir.path().join("fresh.db")).unwrap();
        assert_eq!(store.schema_version().unwrap(), 0);
        assert_eq!(store.pending_migrations().unwrap().len(), migrations::MIGRATIONS.len());
    }

    #[test]
    fn test_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        student(&store, "s@school.test", "10A");
        let stats = store.stats().unwrap();
        assert_eq!(stats.rows("user_details"), Some(1));
        assert_eq!(stats.rows("student_gamification"), Some(1));
        assert_eq!(stats.tables.len(), 13);
        assert!(store.count_rows("sqlite_master").is_err());
    }
}
