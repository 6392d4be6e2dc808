//! Users and roles
//!
//! Every account is one of three roles:
//! - `Teacher`: authors quizzes and curricula
//! - `Student`: submits papers, practices topics, attempts quizzes
//! - `Parent`: follows linked students

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account role, stored as lowercase text and CHECK-constrained in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    Parent,
}

impl Role {
    /// Get the string representation of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// Get all roles
    pub fn all() -> &'static [Role] {
        &[Role::Teacher, Role::Student, Role::Parent]
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            _ => Err(Error::InvalidValue(format!("Unknown role: {}", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of `user_details`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Class the user belongs to; teachers usually have none
    pub class: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Data needed to create a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub class: Option<String>,
}

impl NewUser {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            class: None,
        }
    }

    /// Set the class
    pub fn in_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// Short student listing used by class rosters and search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub class: Option<String>,
}
