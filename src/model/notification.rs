use super::User;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// A new quiz was published for the user's class
    Quiz,
    /// A quiz deadline is approaching
    Deadline,
    /// A badge was earned
    Achievement,
    General,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Quiz => "quiz",
            NotificationType::Deadline => "deadline",
            NotificationType::Achievement => "achievement",
            NotificationType::General => "general",
        }
    }

    pub fn all() -> &'static [NotificationType] {
        &[
            NotificationType::Quiz,
            NotificationType::Deadline,
            NotificationType::Achievement,
            NotificationType::General,
        ]
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quiz" => Ok(NotificationType::Quiz),
            "deadline" => Ok(NotificationType::Deadline),
            "achievement" => Ok(NotificationType::Achievement),
            "general" => Ok(NotificationType::General),
            _ => Err(Error::InvalidValue(format!("Unknown notification type: {}", s))),
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of `notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// A row of `parent_students`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLink {
    pub id: i64,
    pub parent_id: i64,
    pub student_id: i64,
    pub relationship: String,
    pub created_at: NaiveDateTime,
}

/// A student as seen from a linked parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedStudent {
    #[serde(flatten)]
    pub student: User,
    pub relationship: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_roundtrip() {
        for kind in NotificationType::all() {
            let parsed: NotificationType = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert!("reminder".parse::<NotificationType>().is_err());
    }
}
