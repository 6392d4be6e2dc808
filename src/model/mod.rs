//! Typed records for every table of the schema
//!
//! Enumerated columns (`role`, `question_type`, `notification_type`) map to
//! Rust enums with `as_str` / `FromStr`, mirroring the CHECK sets in SQL.

pub mod analytics;
pub mod image;
pub mod learning;
pub mod notification;
pub mod quiz;
pub mod user;

pub use analytics::{ClassAnalytics, StudentOverview, SubjectPerformance, TopPerformer, TrendPoint};
pub use image::{ImageEmbedding, ImageMatch, NewImage};
pub use learning::{
    Badge, Curriculum, Gamification, LearnedTopic, NewPaperAnalysis, PaperAnalysis, PaperReport,
    PointsAward, StudentProgress, TopicStatus, WeakTopic, WeakTopicProgress,
};
pub use notification::{LinkedStudent, Notification, NotificationType, ParentLink};
pub use quiz::{
    AttemptListing, NewQuestion, NewQuiz, QuestionSpec, QuestionType, Quiz, QuizAnswers, QuizAttempt,
    QuizListing, QuizQuestion, QuizSummaryRow,
};
pub use user::{NewUser, Role, StudentSummary, User};
