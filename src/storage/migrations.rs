//! Versioned, forward-only schema migrations
//!
//! Applied versions are recorded in `schema_migrations`. Each pending
//! migration runs in its own transaction, in version order. A database that
//! already carries a newer version than this build knows is refused.

use super::schema::*;
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// One schema step
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub tables: &'static [&'static str],
    pub indexes: &'static [&'static str],
}

impl Migration {
    /// Statements in execution order
    pub fn statements(&self) -> impl Iterator<Item = &'static str> {
        self.tables.iter().chain(self.indexes.iter()).copied()
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "core_tables",
        tables: &[
            CREATE_USER_DETAILS_TABLE,
            CREATE_CURRICULUM_TABLE,
            CREATE_PAPER_ANALYSIS_TABLE,
            CREATE_STUDENT_PROGRESS_TABLE,
            CREATE_LEARNED_TOPICS_TABLE,
            CREATE_STUDENT_GAMIFICATION_TABLE,
            CREATE_BADGES_TABLE,
        ],
        indexes: CORE_INDEXES,
    },
    Migration {
        version: 2,
        name: "quizzes",
        tables: &[CREATE_QUIZZES_TABLE, CREATE_QUIZ_QUESTIONS_TABLE, CREATE_QUIZ_ATTEMPTS_TABLE],
        indexes: QUIZ_INDEXES,
    },
    Migration {
        version: 3,
        name: "notifications_and_parents",
        tables: &[CREATE_NOTIFICATIONS_TABLE, CREATE_PARENT_STUDENTS_TABLE],
        indexes: NOTIFICATION_INDEXES,
    },
    Migration {
        version: 4,
        name: "image_embeddings",
        tables: &[CREATE_IMAGE_EMBEDDINGS_TABLE, CREATE_VECTOR_INDEXES_TABLE],
        indexes: &[REGISTER_IMAGE_EMBEDDINGS_ANN_INDEX],
    },
];

const CREATE_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Highest version this build knows about
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Version recorded in the database, 0 when nothing was applied.
/// Only reads; a database without a history table is at version 0.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let tracked = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !tracked {
        return Ok(0);
    }
    let version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migrations not yet applied
pub fn pending(conn: &Connection) -> Result<Vec<&'static Migration>> {
    let current = current_version(conn)?;
    Ok(MIGRATIONS.iter().filter(|m| m.version > current).collect())
}

/// Apply every pending migration. Returns the versions applied by this call.
pub fn migrate(conn: &Connection) -> Result<Vec<u32>> {
    conn.execute_batch(CREATE_HISTORY_TABLE)?;
    let current = current_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(Error::SchemaTooNew { found: current, supported: latest });
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        for stmt in migration.statements() {
            tx.execute_batch(stmt)?;
        }
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        tracing::info!("Applied migration {} ({})", migration.version, migration.name);
        applied.push(migration.version);
    }

    if applied.is_empty() {
        tracing::debug!("Schema up to date at version {}", current);
    }
    Ok(applied)
}

/// Full DDL of every migration, for printing
pub fn render_sql() -> String {
    let mut out = String::new();
    for migration in MIGRATIONS {
        out.push_str(&format!("-- migration {}: {}\n", migration.version, migration.name));
        for stmt in migration.statements() {
            out.push_str(stmt.trim());
            out.push_str(";\n");
        }
        out.push('\n');
    }
    out
}
