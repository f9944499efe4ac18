use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::services::{QuizCard, QuizDetail};
use crate::db::{Question, Quiz, User};

/// Fields of the create/edit multipart form.
#[derive(Debug, Default)]
pub struct QuizForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: bool,
    pub cover: Option<CoverUpload>,
}

#[derive(Debug)]
pub struct CoverUpload {
    pub file_name: String,
    pub body: Bytes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuestionForm {
    pub question_text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizListContext {
    pub quizzes: Vec<QuizCard>,
}

/// Create and edit forms. `quiz` is set when editing.
#[derive(Debug, Default, Serialize)]
pub struct QuizFormContext {
    pub message: Option<String>,
    pub quiz: Option<Quiz>,
}

#[derive(Debug, Serialize)]
pub struct AddQuestionsContext {
    pub message: Option<String>,
    pub quiz: QuizDetail,
}

#[derive(Debug, Serialize)]
pub struct PlayContext {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// Public face of a quiz author. The email stays private.
#[derive(Debug, Serialize)]
pub struct CreatorView {
    pub id: i64,
    pub username: String,
}

impl From<User> for CreatorView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizDetailContext {
    pub quiz: QuizDetail,
    pub creator: Option<CreatorView>,
    pub is_favorited: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub favorited: bool,
}
