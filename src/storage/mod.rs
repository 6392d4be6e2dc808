//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with the 13 application tables:
//! - user_details, curriculum
//! - paper_analysis, student_progress, learned_topics
//! - student_gamification, badges
//! - quizzes, quiz_questions, quiz_attempts
//! - notifications, parent_students
//! - image_embeddings (with the `vector_indexes` registry)
//!
//! [`SqliteStore`] is defined in `sqlite`; each sibling module adds the
//! operations for one group of tables.

pub mod schema;
pub mod migrations;
pub mod sqlite;
pub mod gamification;
pub mod learning;
pub mod quiz;
pub mod notify;
pub mod analytics;
pub mod images;

pub use migrations::Migration;
pub use sqlite::{SqliteStore, DbStats};
