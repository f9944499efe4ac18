use serde::Serialize;

use crate::db::{Question, Quiz, RepoResult, Repository};

/// Quiz with its questions attached, in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// Listing entry: the quiz plus how many questions it has.
#[derive(Debug, Clone, Serialize)]
pub struct QuizCard {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub question_count: usize,
}

pub async fn load_quiz(repo: &dyn Repository, quiz_id: i64) -> RepoResult<Option<QuizDetail>> {
    let Some(quiz) = repo.quiz_by_id(quiz_id).await? else {
        return Ok(None);
    };
    let questions = repo.questions_for_quiz(quiz.id).await?;
    Ok(Some(QuizDetail { quiz, questions }))
}

pub async fn cards(repo: &dyn Repository, quizzes: Vec<Quiz>) -> RepoResult<Vec<QuizCard>> {
    let mut out = Vec::with_capacity(quizzes.len());
    for quiz in quizzes {
        let question_count = repo.questions_for_quiz(quiz.id).await?.len();
        out.push(QuizCard {
            quiz,
            question_count,
        });
    }
    Ok(out)
}

/// Flips favorite membership and returns the new state.
///
/// Check-then-act without extra isolation: two concurrent toggles may both
/// insert (the second is ignored by the backend) or both delete, which still
/// leaves a valid membership state.
pub async fn toggle_favorite(repo: &dyn Repository, user_id: i64, quiz_id: i64) -> RepoResult<bool> {
    if repo.is_favorite(user_id, quiz_id).await? {
        repo.remove_favorite(user_id, quiz_id).await?;
        Ok(false)
    } else {
        repo.add_favorite(user_id, quiz_id).await?;
        Ok(true)
    }
}
