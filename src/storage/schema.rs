//! Database schema definitions
//!
//! Table DDL is split per table; [`super::migrations`] groups the statements
//! into versioned migrations. Enumerated columns carry CHECK constraints and
//! every reference to a user or quiz cascades on delete.

/// SQL to create the user_details table
pub const CREATE_USER_DETAILS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name VARCHAR(100) NOT NULL,
    email VARCHAR(100) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(20) NOT NULL CHECK (role IN ('teacher', 'student', 'parent')),
    class VARCHAR(50),
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the curriculum table
pub const CREATE_CURRICULUM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS curriculum (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    class VARCHAR(50) NOT NULL,
    subject VARCHAR(100) NOT NULL,
    curriculum TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(class, subject)
)
"#;

pub const CREATE_PAPER_ANALYSIS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS paper_analysis (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    class VARCHAR(50) NOT NULL,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    student_name VARCHAR(100),
    subject VARCHAR(100) NOT NULL,
    student_paper TEXT,
    analysis_by_model TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_STUDENT_PROGRESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS student_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    class VARCHAR(50) NOT NULL,
    subject VARCHAR(100) NOT NULL,
    topic VARCHAR(255) NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    correct_attempts INTEGER NOT NULL DEFAULT 0,
    last_feedback TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the learned_topics table
/// One row per (student, subject, topic); re-learning overwrites the content
pub const CREATE_LEARNED_TOPICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS learned_topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    class VARCHAR(50) NOT NULL,
    subject VARCHAR(100) NOT NULL,
    topic VARCHAR(255) NOT NULL,
    learned_content TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(student_id, subject, topic)
)
"#;

pub const CREATE_STUDENT_GAMIFICATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS student_gamification (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL UNIQUE REFERENCES user_details(id) ON DELETE CASCADE,
    total_points INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date DATE,
    level INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_BADGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS badges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    badge_name VARCHAR(100) NOT NULL,
    badge_description TEXT,
    badge_icon VARCHAR(50),
    earned_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_QUIZZES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quizzes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    teacher_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    class VARCHAR(50) NOT NULL,
    subject VARCHAR(100) NOT NULL,
    title VARCHAR(255) NOT NULL,
    duration_minutes INTEGER NOT NULL,
    total_marks INTEGER NOT NULL,
    deadline TIMESTAMP,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the quiz_questions table
/// `options` holds a JSON array of choices for mcq questions
pub const CREATE_QUIZ_QUESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
    question_text TEXT NOT NULL,
    question_type VARCHAR(20) NOT NULL CHECK (question_type IN ('mcq', 'short_answer', 'long_answer')),
    options TEXT CHECK (options IS NULL OR json_valid(options)),
    correct_answer TEXT,
    marks INTEGER NOT NULL DEFAULT 1,
    order_num INTEGER NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the quiz_attempts table
/// `answers` is a JSON object from question index to answer text
pub const CREATE_QUIZ_ATTEMPTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    answers TEXT NOT NULL CHECK (json_valid(answers)),
    score REAL,
    total_marks INTEGER NOT NULL,
    time_taken INTEGER NOT NULL DEFAULT 0,
    submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    evaluated_at TIMESTAMP,
    feedback TEXT
)
"#;

pub const CREATE_NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    title VARCHAR(255) NOT NULL,
    message TEXT NOT NULL,
    notification_type VARCHAR(20) NOT NULL CHECK (notification_type IN ('quiz', 'deadline', 'achievement', 'general')),
    is_read INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_PARENT_STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS parent_students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    student_id INTEGER NOT NULL REFERENCES user_details(id) ON DELETE CASCADE,
    relationship VARCHAR(50) NOT NULL DEFAULT 'parent',
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(parent_id, student_id)
)
"#;

/// SQL to create the image_embeddings table
/// `embedding` is 3584 little-endian f16 values (7168 bytes)
pub const CREATE_IMAGE_EMBEDDINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS image_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name VARCHAR(255) NOT NULL,
    image_path TEXT NOT NULL,
    embedding BLOB CHECK (embedding IS NULL OR length(embedding) = 7168),
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the vector index registry
/// SQLite has no vector index type; the definition lives here and the graph is built in memory
pub const CREATE_VECTOR_INDEXES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vector_indexes (
    name TEXT PRIMARY KEY,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    method TEXT NOT NULL CHECK (method IN ('hnsw')),
    metric TEXT NOT NULL CHECK (metric IN ('cosine')),
    dimensions INTEGER NOT NULL,
    element_type TEXT NOT NULL CHECK (element_type IN ('f16')),
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Name of the approximate-nearest-neighbor index on image_embeddings(embedding)
pub const IMAGE_EMBEDDINGS_ANN_INDEX: &str = "idx_image_embeddings_hnsw";

pub const REGISTER_IMAGE_EMBEDDINGS_ANN_INDEX: &str = r#"
INSERT OR IGNORE INTO vector_indexes (name, table_name, column_name, method, metric, dimensions, element_type)
VALUES ('idx_image_embeddings_hnsw', 'image_embeddings', 'embedding', 'hnsw', 'cosine', 3584, 'f16')
"#;

pub const CORE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_curriculum_class_subject ON curriculum(class, subject)",
    "CREATE INDEX IF NOT EXISTS idx_paper_analysis_student ON paper_analysis(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_paper_analysis_class ON paper_analysis(class)",
    "CREATE INDEX IF NOT EXISTS idx_student_progress_student ON student_progress(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_learned_topics_student ON learned_topics(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_badges_student ON badges(student_id)",
];

pub const QUIZ_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_quizzes_class ON quizzes(class)",
    "CREATE INDEX IF NOT EXISTS idx_quiz_questions_quiz ON quiz_questions(quiz_id)",
    "CREATE INDEX IF NOT EXISTS idx_quiz_attempts_quiz ON quiz_attempts(quiz_id)",
    "CREATE INDEX IF NOT EXISTS idx_quiz_attempts_student ON quiz_attempts(student_id)",
];

pub const NOTIFICATION_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_parent_students_parent ON parent_students(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_parent_students_student ON parent_students(student_id)",
];

/// Tables in dependency order, parents first
pub const TABLES: &[&str] = &[
    "user_details",
    "curriculum",
    "paper_analysis",
    "student_progress",
    "learned_topics",
    "student_gamification",
    "badges",
    "quizzes",
    "quiz_questions",
    "quiz_attempts",
    "notifications",
    "parent_students",
    "image_embeddings",
];
