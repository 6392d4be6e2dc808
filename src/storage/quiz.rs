//! Quiz publishing, attempts and evaluation

use rusqlite::{OptionalExtension, params};
use crate::model::learning::round1;
use crate::model::quiz::format_time_taken;
use crate::model::{
    AttemptListing, NewQuiz, NotificationType, QuestionSpec, QuestionType, Quiz, QuizAnswers, QuizAttempt,
    QuizListing, QuizQuestion, QuizSummaryRow,
};
use crate::{Error, Result};
use super::gamification::{award_points, today};
use super::notify::insert_notification;
use super::sqlite::{SqliteStore, parse_column};

/// Points for submitting an attempt
pub const QUIZ_SUBMIT_POINTS: i64 = 20;

/// Bonus points by minimum percentage, checked in order
const EVALUATION_BONUSES: &[(f64, i64, &str)] = &[
    (90.0, 30, "Quiz Excellence (90%+)"),
    (75.0, 20, "Quiz Success (75%+)"),
    (50.0, 10, "Quiz Passed (50%+)"),
];

/// Bonus awarded for scoring `percentage`, with its reason
pub fn evaluation_bonus(percentage: f64) -> Option<(i64, &'static str)> {
    EVALUATION_BONUSES
        .iter()
        .find(|(min, _, _)| percentage >= *min)
        .map(|(_, points, reason)| (*points, *reason))
}

fn percentage(score: f64, total_marks: i64) -> f64 {
    if total_marks > 0 { score / total_marks as f64 * 100.0 } else { 0.0 }
}

impl SqliteStore {
    /// Publish a quiz with its questions and notify every student of the class
    pub fn create_quiz(&self, quiz: &NewQuiz) -> Result<i64> {
        quiz.validate()?;
        let tx = self.immediate()?;

        tx.execute(
            r#"
            INSERT INTO quizzes (teacher_id, class, subject, title, duration_minutes, total_marks, deadline)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                quiz.teacher_id,
                quiz.class,
                quiz.subject,
                quiz.title,
                quiz.duration_minutes,
                quiz.total_marks,
                quiz.deadline,
            ],
        )?;
        let quiz_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO quiz_questions (quiz_id, question_text, question_type, options, correct_answer, marks, order_num)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (i, question) in quiz.questions.iter().enumerate() {
                insert.execute(params![
                    quiz_id,
                    question.question_text,
                    question.spec.question_type().as_str(),
                    question.spec.options_json()?,
                    question.spec.correct_answer(),
                    question.marks,
                    i as i64 + 1,
                ])?;
            }
        }

        let students: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM user_details WHERE role = 'student' AND class = ?1")?;
            let ids = stmt
                .query_map([&quiz.class], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        let message = format!("Quiz '{}' for {} is now available!", quiz.title, quiz.subject);
        for student_id in &students {
            insert_notification(&tx, *student_id, "New Quiz Available", &message, NotificationType::Quiz)?;
        }

        tx.commit()?;
        tracing::info!(
            "Created quiz {} '{}' with {} questions, notified {} students",
            quiz_id,
            quiz.title,
            quiz.questions.len(),
            students.len()
        );
        Ok(quiz_id)
    }

    pub fn get_quiz(&self, quiz_id: i64) -> Result<Option<Quiz>> {
        self.conn
            .query_row(
                r#"
                SELECT id, teacher_id, class, subject, title, duration_minutes, total_marks, deadline, created_at
                FROM quizzes WHERE id = ?1
                "#,
                [quiz_id],
                row_to_quiz,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Quizzes of a class with their author, newest first
    pub fn quizzes_for_class(&self, class: &str, subject: Option<&str>) -> Result<Vec<QuizListing>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT q.id, q.teacher_id, q.class, q.subject, q.title, q.duration_minutes,
                   q.total_marks, q.deadline, q.created_at, u.full_name
            FROM quizzes q
            JOIN user_details u ON q.teacher_id = u.id
            WHERE q.class = ?1 AND (?2 IS NULL OR q.subject = ?2)
            ORDER BY q.created_at DESC, q.id DESC
            "#,
        )?;
        let quizzes = stmt
            .query_map(params![class, subject], |row| {
                Ok(QuizListing { quiz: row_to_quiz(row)?, teacher_name: row.get(9)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(quizzes)
    }

    /// Questions of a quiz in order
    pub fn quiz_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, quiz_id, question_text, question_type, options, correct_answer, marks, order_num, created_at
            FROM quiz_questions WHERE quiz_id = ?1
            ORDER BY order_num
            "#,
        )?;
        let questions = stmt
            .query_map([quiz_id], |row| {
                let kind: QuestionType = parse_column(row, 3)?;
                let options: Option<String> = row.get(4)?;
                let spec = QuestionSpec::from_columns(kind, options.as_deref(), row.get(5)?).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                })?;
                Ok(QuizQuestion {
                    id: row.get(0)?,
                    quiz_id: row.get(1)?,
                    question_text: row.get(2)?,
                    spec,
                    marks: row.get(6)?,
                    order_num: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(questions)
    }

    /// Record a student's answers. The attempt takes the quiz's total marks.
    pub fn submit_quiz_attempt(
        &self,
        quiz_id: i64,
        student_id: i64,
        answers: &QuizAnswers,
        time_taken_secs: i64,
    ) -> Result<i64> {
        if time_taken_secs < 0 {
            return Err(Error::InvalidValue(format!("time taken must not be negative, got {}", time_taken_secs)));
        }
        let tx = self.immediate()?;

        let total_marks: i64 = tx
            .query_row("SELECT total_marks FROM quizzes WHERE id = ?1", [quiz_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("quiz {}", quiz_id)))?;
        let question_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = ?1",
            [quiz_id],
            |row| row.get(0),
        )?;
        answers.validate(question_count as usize)?;

        tx.execute(
            r#"
            INSERT INTO quiz_attempts (quiz_id, student_id, answers, time_taken, total_marks)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![quiz_id, student_id, serde_json::to_string(answers)?, time_taken_secs, total_marks],
        )?;
        let attempt_id = tx.last_insert_rowid();
        award_points(&tx, student_id, QUIZ_SUBMIT_POINTS, "Quiz Completed", today())?;
        tx.commit()?;
        Ok(attempt_id)
    }

    /// Store a grade and feedback, then award the performance bonus
    pub fn evaluate_quiz_attempt(&self, attempt_id: i64, score: f64, feedback: &str) -> Result<()> {
        if !score.is_finite() || score < 0.0 {
            return Err(Error::InvalidValue(format!("score must be a non-negative number, got {}", score)));
        }
        let tx = self.immediate()?;

        let updated = tx.execute(
            "UPDATE quiz_attempts SET score = ?1, feedback = ?2, evaluated_at = CURRENT_TIMESTAMP WHERE id = ?3",
            params![score, feedback, attempt_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("quiz attempt {}", attempt_id)));
        }

        let (student_id, total_marks): (i64, i64) = tx.query_row(
            "SELECT student_id, total_marks FROM quiz_attempts WHERE id = ?1",
            [attempt_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if let Some((points, reason)) = evaluation_bonus(percentage(score, total_marks)) {
            award_points(&tx, student_id, points, reason, today())?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Attempts of a student, newest first
    pub fn quiz_attempts(&self, student_id: i64, quiz_id: Option<i64>) -> Result<Vec<AttemptListing>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT qa.id, qa.quiz_id, qa.student_id, qa.answers, qa.score, qa.total_marks,
                   qa.time_taken, qa.submitted_at, qa.evaluated_at, qa.feedback, q.title, q.subject
            FROM quiz_attempts qa
            JOIN quizzes q ON qa.quiz_id = q.id
            WHERE qa.student_id = ?1 AND (?2 IS NULL OR qa.quiz_id = ?2)
            ORDER BY qa.submitted_at DESC, qa.id DESC
            "#,
        )?;
        let attempts = stmt
            .query_map(params![student_id, quiz_id], |row| {
                Ok(AttemptListing { attempt: row_to_attempt(row)?, title: row.get(10)?, subject: row.get(11)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(attempts)
    }

    /// Evaluated attempts of a student with percentages, newest first
    pub fn quiz_summary(&self, student_id: i64) -> Result<Vec<QuizSummaryRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT qa.id, q.title, q.subject, qa.score, qa.total_marks, qa.submitted_at, qa.time_taken
            FROM quiz_attempts qa
            JOIN quizzes q ON qa.quiz_id = q.id
            WHERE qa.student_id = ?1 AND qa.score IS NOT NULL
            ORDER BY qa.submitted_at DESC, qa.id DESC
            "#,
        )?;
        let rows = stmt
            .query_map([student_id], |row| {
                let score: f64 = row.get(3)?;
                let total_marks: i64 = row.get(4)?;
                let submitted_at: chrono::NaiveDateTime = row.get(5)?;
                let time_taken: i64 = row.get(6)?;
                Ok(QuizSummaryRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    subject: row.get(2)?,
                    obtained_marks: score,
                    total_marks,
                    percentage: round1(percentage(score, total_marks)),
                    date: submitted_at.date(),
                    time_taken: format_time_taken(time_taken),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete a quiz together with its questions and attempts
    pub fn delete_quiz(&self, quiz_id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM quizzes WHERE id = ?1", [quiz_id])?;
        Ok(removed > 0)
    }
}

fn row_to_quiz(row: &rusqlite::Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        class: row.get(2)?,
        subject: row.get(3)?,
        title: row.get(4)?,
        duration_minutes: row.get(5)?,
        total_marks: row.get(6)?,
        deadline: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn row_to_attempt(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuizAttempt> {
    let answers: String = row.get(3)?;
    let answers: QuizAnswers = serde_json::from_str(&answers).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(QuizAttempt {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        student_id: row.get(2)?,
        answers,
        score: row.get(4)?,
        total_marks: row.get(5)?,
        time_taken: row.get(6)?,
        submitted_at: row.get(7)?,
        evaluated_at: row.get(8)?,
        feedback: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewQuestion, NewUser, Role};

    struct Fixture {
        store: SqliteStore,
        teacher: i64,
        students: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let store = SqliteStore::open_in_memory().unwrap();
        let teacher = store
            .create_user(&NewUser::new("Ms Rao", "rao@school.test", "h", Role::Teacher))
            .unwrap();
        let students = ["a", "b"]
            .iter()
            .map(|name| {
                store
                    .create_user(&NewUser::new(*name, format!("{}@school.test", name), "h", Role::Student).in_class("9A"))
                    .unwrap()
            })
            .collect();
        Fixture { store, teacher, students }
    }

    fn sample_quiz(teacher_id: i64) -> NewQuiz {
        NewQuiz {
            teacher_id,
            class: "9A".to_string(),
            subject: "Science".to_string(),
            title: "Planets".to_string(),
            duration_minutes: 15,
            total_marks: 10,
            deadline: None,
            questions: vec![
                NewQuestion::new("Closest planet to the sun?", 5, QuestionSpec::mcq(["Mercury", "Venus", "Mars"], "Mercury")),
                NewQuestion::new(
                    "Why is Mars red?",
                    5,
                    QuestionSpec::ShortAnswer { correct_answer: "Iron oxide".to_string() },
                ),
            ],
        }
    }

    #[test]
    fn test_create_quiz_notifies_class() {
        let f = fixture();
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();

        for student in &f.students {
            let notes = f.store.notifications(*student, true).unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].notification_type, NotificationType::Quiz);
            assert_eq!(notes[0].title, "New Quiz Available");
            assert_eq!(notes[0].message, "Quiz 'Planets' for Science is now available!");
        }
        assert!(f.store.notifications(f.teacher, false).unwrap().is_empty());

        let listed = f.store.quizzes_for_class("9A", None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].quiz.id, quiz_id);
        assert_eq!(listed[0].teacher_name, "Ms Rao");
        assert!(f.store.quizzes_for_class("9A", Some("History")).unwrap().is_empty());
    }

    #[test]
    fn test_mcq_options_roundtrip() {
        let f = fixture();
        let quiz = sample_quiz(f.teacher);
        let quiz_id = f.store.create_quiz(&quiz).unwrap();

        let questions = f.store.quiz_questions(quiz_id).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].order_num, 1);
        assert_eq!(questions[1].order_num, 2);
        assert_eq!(questions[0].spec, quiz.questions[0].spec);
        assert_eq!(
            questions[0].spec.options().unwrap(),
            &["Mercury".to_string(), "Venus".to_string(), "Mars".to_string()]
        );
        assert_eq!(questions[1].spec.question_type(), QuestionType::ShortAnswer);
    }

    #[test]
    fn test_invalid_quiz_writes_nothing() {
        let f = fixture();
        let mut quiz = sample_quiz(f.teacher);
        quiz.questions.push(NewQuestion::new("Pick one", 1, QuestionSpec::mcq(["yes", "no"], "maybe")));

        let err = f.store.create_quiz(&quiz).unwrap_err();
        assert!(matches!(err, Error::InvalidQuestion(ref msg) if msg.starts_with("question 3")));
        assert_eq!(f.store.count_rows("quizzes").unwrap(), 0);
        assert_eq!(f.store.count_rows("notifications").unwrap(), 0);
    }

    #[test]
    fn test_options_column_must_be_json() {
        let f = fixture();
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();
        let err: Error = f
            .store
            .connection()
            .execute(
                "INSERT INTO quiz_questions (quiz_id, question_text, question_type, options, marks, order_num) VALUES (?1, 'q', 'mcq', 'not json', 1, 3)",
                [quiz_id],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(crate::IntegrityViolation::Check));
    }

    #[test]
    fn test_unknown_question_type_rejected_by_storage() {
        let f = fixture();
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();
        let err: Error = f
            .store
            .connection()
            .execute(
                "INSERT INTO quiz_questions (quiz_id, question_text, question_type, correct_answer, marks, order_num) VALUES (?1, 'q', 'essay', 'a', 1, 3)",
                [quiz_id],
            )
            .unwrap_err()
            .into();
        assert_eq!(err.integrity_violation(), Some(crate::IntegrityViolation::Check));
        assert_eq!(f.store.count_rows("quiz_questions").unwrap(), 2);
    }

    #[test]
    fn test_submit_and_evaluate() {
        let f = fixture();
        let student = f.students[0];
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();

        let answers = QuizAnswers::new().answer(0, "Mercury").answer(1, "Rust on the surface");
        let attempt_id = f.store.submit_quiz_attempt(quiz_id, student, &answers, 125).unwrap();
        assert_eq!(f.store.gamification(student).unwrap().unwrap().total_points, QUIZ_SUBMIT_POINTS);
        assert!(f.store.quiz_summary(student).unwrap().is_empty());

        f.store.evaluate_quiz_attempt(attempt_id, 8.0, "Good work").unwrap();
        assert_eq!(f.store.gamification(student).unwrap().unwrap().total_points, QUIZ_SUBMIT_POINTS + 20);

        let attempts = f.store.quiz_attempts(student, Some(quiz_id)).unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].attempt.answers, answers);
        assert_eq!(attempts[0].attempt.total_marks, 10);
        assert!(attempts[0].attempt.is_evaluated());
        assert!(attempts[0].attempt.evaluated_at.is_some());
        assert_eq!(attempts[0].title, "Planets");

        let summary = f.store.quiz_summary(student).unwrap();
        assert_eq!(summary[0].percentage, 80.0);
        assert_eq!(summary[0].time_taken, "2m 5s");
    }

    #[test]
    fn test_submit_rejects_bad_answers() {
        let f = fixture();
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();
        let answers = QuizAnswers::new().answer(5, "??");
        assert!(f.store.submit_quiz_attempt(quiz_id, f.students[0], &answers, 10).is_err());
        assert!(matches!(
            f.store.submit_quiz_attempt(999, f.students[0], &QuizAnswers::new(), 10),
            Err(Error::NotFound(_))
        ));
        assert_eq!(f.store.count_rows("quiz_attempts").unwrap(), 0);
    }

    #[test]
    fn test_evaluation_bonus() {
        assert_eq!(evaluation_bonus(95.0).map(|b| b.0), Some(30));
        assert_eq!(evaluation_bonus(90.0).map(|b| b.0), Some(30));
        assert_eq!(evaluation_bonus(75.0).map(|b| b.0), Some(20));
        assert_eq!(evaluation_bonus(50.0).map(|b| b.0), Some(10));
        assert_eq!(evaluation_bonus(49.9), None);
    }

    #[test]
    fn test_evaluate_missing_attempt() {
        let f = fixture();
        assert!(matches!(f.store.evaluate_quiz_attempt(1, 5.0, "x"), Err(Error::NotFound(_))));
        assert!(matches!(f.store.evaluate_quiz_attempt(1, -1.0, "x"), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_delete_quiz_cascades() {
        let f = fixture();
        let quiz_id = f.store.create_quiz(&sample_quiz(f.teacher)).unwrap();
        f.store
            .submit_quiz_attempt(quiz_id, f.students[0], &QuizAnswers::new().answer(0, "Venus"), 30)
            .unwrap();

        assert!(f.store.delete_quiz(quiz_id).unwrap());
        assert_eq!(f.store.count_rows("quiz_questions").unwrap(), 0);
        assert_eq!(f.store.count_rows("quiz_attempts").unwrap(), 0);
        assert!(!f.store.delete_quiz(quiz_id).unwrap());
    }
}
