use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---- raw rows (shared by both backends) ----

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, FromRow)]
pub struct AvatarRow {
    pub id: i64,
    pub user_id: i64,
    pub outfit: Option<String>,
    pub accessory: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct QuizRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_by: i64,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: Option<String>,
}

// ---- records ----

/// Account record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Avatar {
    pub id: i64,
    pub user_id: i64,
    pub outfit: Option<String>,
    pub accessory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_by: i64,
    pub cover_image_url: Option<String>,
}

/// One of the four answer slots of a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("answer option must be one of A, B, C or D")]
pub struct InvalidAnswerOption;

impl FromStr for AnswerOption {
    type Err = InvalidAnswerOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(AnswerOption::A),
            "B" => Ok(AnswerOption::B),
            "C" => Ok(AnswerOption::C),
            "D" => Ok(AnswerOption::D),
            _ => Err(InvalidAnswerOption),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: Option<AnswerOption>,
}

// ---- write models ----

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_by: i64,
    pub cover_image_url: Option<String>,
}

/// Partial quiz update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct QuizChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub quiz_id: i64,
    pub question_text: String,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: AnswerOption,
}

/// Partial avatar update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AvatarChanges {
    pub outfit: Option<String>,
    pub accessory: Option<String>,
}

// ---- row -> record ----

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
        }
    }
}

impl From<AvatarRow> for Avatar {
    fn from(r: AvatarRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            outfit: r.outfit,
            accessory: r.accessory,
        }
    }
}

impl From<QuizRow> for Quiz {
    fn from(r: QuizRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            is_public: r.is_public,
            created_by: r.created_by,
            cover_image_url: r.cover_image_url,
        }
    }
}

impl From<QuestionRow> for Question {
    fn from(r: QuestionRow) -> Self {
        // unknown letters in legacy rows degrade to "no correct answer"
        let correct_option = r.correct_option.as_deref().and_then(|s| s.parse().ok());
        Self {
            id: r.id,
            quiz_id: r.quiz_id,
            question_text: r.question_text,
            option_a: r.option_a,
            option_b: r.option_b,
            option_c: r.option_c,
            option_d: r.option_d,
            correct_option,
        }
    }
}

pub(crate) fn map_rows<R, T: From<R>>(rows: Vec<R>) -> Vec<T> {
    rows.into_iter().map(T::from).collect()
}
