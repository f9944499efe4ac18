use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use super::{
    dto::{
        AddQuestionsContext, CoverUpload, CreatorView, FavoriteResponse, PlayContext, QuestionForm,
        QuizDetailContext, QuizForm, QuizFormContext, QuizListContext,
    },
    scoring::{parse_answers, score_submission, Score},
    services::{self, QuizDetail},
};
use crate::{
    auth::identity::{ApiUser, MaybeUser, SignedIn},
    db::{AnswerOption, NewQuestion, NewQuiz, Quiz, QuizChanges},
    error::{ApiError, AppError},
    state::AppState,
};

const TITLE_REQUIRED: &str = "Please give the quiz a title.";
const QUESTION_INVALID: &str = "A question needs its text and a correct option (A, B, C or D).";

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/my_sets", get(my_sets))
        .route("/dashboard/create_quiz", get(create_quiz_form).post(create_quiz))
        .route("/dashboard/add_questions/:id", get(add_questions_form).post(add_question))
        .route("/dashboard/delete_question/:id", post(delete_question))
        .route("/dashboard/discover", get(discover))
        .route("/dashboard/quiz/:id", get(quiz_detail))
        .route("/dashboard/edit_quiz/:id", get(edit_quiz_form).post(edit_quiz))
        .route("/dashboard/delete_quiz/:id", post(delete_quiz))
        .route("/dashboard/favorites", get(favorites))
        .route("/dashboard/finish_quiz/:id", post(finish_quiz))
        .route("/play/:id", get(play_quiz))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/favorite/:id", post(toggle_favorite))
        .route("/dashboard/submit_quiz/:id", post(submit_quiz))
}

/// Loads a quiz the caller is allowed to modify.
async fn owned_quiz(state: &AppState, quiz_id: i64, user_id: i64) -> Result<Quiz, AppError> {
    let quiz = state
        .repo
        .quiz_by_id(quiz_id)
        .await?
        .ok_or(AppError::NotFound("quiz"))?;
    if quiz.created_by != user_id {
        warn!(quiz_id, user_id, owner = quiz.created_by, "quiz ownership check failed");
        return Err(AppError::Forbidden);
    }
    Ok(quiz)
}

async fn detail_or_404(state: &AppState, quiz_id: i64) -> Result<QuizDetail, AppError> {
    services::load_quiz(state.repo.as_ref(), quiz_id)
        .await?
        .ok_or(AppError::NotFound("quiz"))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Reads the create/edit form. Unknown fields are skipped.
async fn read_quiz_form(mut mp: Multipart) -> Result<QuizForm, AppError> {
    let mut form = QuizForm::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "is_public" => form.is_public = !field.text().await?.is_empty(),
            "cover_image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await?;
                if !file_name.is_empty() {
                    form.cover = Some(CoverUpload { file_name, body });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn store_cover(state: &AppState, cover: Option<CoverUpload>) -> Result<Option<String>, AppError> {
    match cover {
        Some(c) => Ok(state.uploads.save_image(&c.file_name, c.body).await?),
        None => Ok(None),
    }
}

#[instrument(skip(state, current))]
pub async fn my_sets(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
) -> Result<Json<QuizListContext>, AppError> {
    let quizzes = state.repo.quizzes_by_creator(current.user.id).await?;
    let quizzes = services::cards(state.repo.as_ref(), quizzes).await?;
    Ok(Json(QuizListContext { quizzes }))
}

async fn create_quiz_form(SignedIn(_): SignedIn) -> Json<QuizFormContext> {
    Json(QuizFormContext::default())
}

#[instrument(skip(state, current, mp))]
pub async fn create_quiz(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    mp: Multipart,
) -> Result<Response, AppError> {
    let form = read_quiz_form(mp).await?;
    let Some(title) = non_blank(form.title) else {
        return Ok(Json(QuizFormContext {
            message: Some(TITLE_REQUIRED.into()),
            quiz: None,
        })
        .into_response());
    };

    let cover_image_url = store_cover(&state, form.cover).await?;
    let quiz = state
        .repo
        .create_quiz(&NewQuiz {
            title,
            description: form.description,
            is_public: form.is_public,
            created_by: current.user.id,
            cover_image_url,
        })
        .await?;
    info!(quiz_id = quiz.id, user_id = current.user.id, "quiz created");
    Ok(Redirect::to(&format!("/dashboard/add_questions/{}", quiz.id)).into_response())
}

#[instrument(skip(state, current))]
pub async fn add_questions_form(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
) -> Result<Json<AddQuestionsContext>, AppError> {
    owned_quiz(&state, quiz_id, current.user.id).await?;
    let quiz = detail_or_404(&state, quiz_id).await?;
    Ok(Json(AddQuestionsContext { message: None, quiz }))
}

#[instrument(skip(state, current, form))]
pub async fn add_question(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
    Form(form): Form<QuestionForm>,
) -> Result<Json<AddQuestionsContext>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, current.user.id).await?;

    let text = non_blank(form.question_text);
    let correct = form
        .correct_option
        .as_deref()
        .and_then(|s| s.parse::<AnswerOption>().ok());
    let message = match (text, correct) {
        (Some(question_text), Some(correct_option)) => {
            let question = state
                .repo
                .create_question(&NewQuestion {
                    quiz_id: quiz.id,
                    question_text,
                    option_a: non_blank(form.option_a),
                    option_b: non_blank(form.option_b),
                    option_c: non_blank(form.option_c),
                    option_d: non_blank(form.option_d),
                    correct_option,
                })
                .await?;
            info!(quiz_id, question_id = question.id, "question added");
            None
        }
        _ => Some(QUESTION_INVALID.to_string()),
    };

    let quiz = detail_or_404(&state, quiz_id).await?;
    Ok(Json(AddQuestionsContext { message, quiz }))
}

#[instrument(skip(state, current))]
pub async fn delete_question(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(question_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let question = state
        .repo
        .question_by_id(question_id)
        .await?
        .ok_or(AppError::NotFound("question"))?;
    let quiz = owned_quiz(&state, question.quiz_id, current.user.id).await?;
    state.repo.delete_question(question.id).await?;
    info!(quiz_id = quiz.id, question_id, "question deleted");
    Ok(Redirect::to(&format!("/dashboard/add_questions/{}", quiz.id)))
}

#[instrument(skip(state, _current))]
pub async fn discover(
    State(state): State<AppState>,
    SignedIn(_current): SignedIn,
) -> Result<Json<QuizListContext>, AppError> {
    let quizzes = state.repo.public_quizzes().await?;
    let quizzes = services::cards(state.repo.as_ref(), quizzes).await?;
    Ok(Json(QuizListContext { quizzes }))
}

#[instrument(skip(state, _current))]
pub async fn play_quiz(
    State(state): State<AppState>,
    SignedIn(_current): SignedIn,
    Path(quiz_id): Path<i64>,
) -> Result<Json<PlayContext>, AppError> {
    let QuizDetail { quiz, questions } = detail_or_404(&state, quiz_id).await?;
    Ok(Json(PlayContext { quiz, questions }))
}

/// Readable by anyone; the favorite flag needs a signed-in visitor.
#[instrument(skip(state, current))]
pub async fn quiz_detail(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizDetailContext>, AppError> {
    let quiz = detail_or_404(&state, quiz_id).await?;
    let is_favorited = match &current {
        Some(c) => state.repo.is_favorite(c.user.id, quiz_id).await?,
        None => false,
    };
    let creator = state
        .repo
        .user_by_id(quiz.quiz.created_by)
        .await?
        .map(CreatorView::from);
    Ok(Json(QuizDetailContext {
        quiz,
        creator,
        is_favorited,
    }))
}

#[instrument(skip(state, current))]
pub async fn edit_quiz_form(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
) -> Result<Json<QuizFormContext>, AppError> {
    let quiz = owned_quiz(&state, quiz_id, current.user.id).await?;
    Ok(Json(QuizFormContext {
        message: None,
        quiz: Some(quiz),
    }))
}

/// Blank title keeps the old one; the cover only changes when a new
/// image is uploaded.
#[instrument(skip(state, current, mp))]
pub async fn edit_quiz(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
    mp: Multipart,
) -> Result<Redirect, AppError> {
    let quiz = owned_quiz(&state, quiz_id, current.user.id).await?;
    let form = read_quiz_form(mp).await?;
    let cover_image_url = store_cover(&state, form.cover).await?;

    let changes = QuizChanges {
        title: non_blank(form.title),
        description: form.description,
        is_public: Some(form.is_public),
        cover_image_url,
    };
    state
        .repo
        .update_quiz(quiz.id, &changes)
        .await?
        .ok_or(AppError::NotFound("quiz"))?;
    info!(quiz_id, "quiz updated");
    Ok(Redirect::to("/dashboard/my_sets"))
}

#[instrument(skip(state, current))]
pub async fn delete_quiz(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let quiz = owned_quiz(&state, quiz_id, current.user.id).await?;
    state.repo.delete_quiz(quiz.id).await?;
    info!(quiz_id, user_id = current.user.id, "quiz deleted");
    Ok(Redirect::to("/dashboard/my_sets"))
}

#[instrument(skip(state, current))]
pub async fn favorites(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
) -> Result<Json<QuizListContext>, AppError> {
    let quizzes = state.repo.favorites_for_user(current.user.id).await?;
    let quizzes = services::cards(state.repo.as_ref(), quizzes).await?;
    Ok(Json(QuizListContext { quizzes }))
}

#[instrument(skip(state, current))]
pub async fn finish_quiz(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
    Path(quiz_id): Path<i64>,
) -> Result<Redirect, AppError> {
    owned_quiz(&state, quiz_id, current.user.id).await?;
    Ok(Redirect::to("/dashboard/my_sets"))
}

#[instrument(skip(state, current))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    ApiUser(current): ApiUser,
    Path(quiz_id): Path<i64>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    if state.repo.quiz_by_id(quiz_id).await?.is_none() {
        return Err(AppError::NotFound("quiz").into());
    }
    let favorited = services::toggle_favorite(state.repo.as_ref(), current.user.id, quiz_id).await?;
    info!(quiz_id, user_id = current.user.id, favorited, "favorite toggled");
    Ok(Json(FavoriteResponse { favorited }))
}

/// Body is read raw so that a missing or malformed JSON document scores as
/// an empty submission instead of being rejected.
#[instrument(skip(state, _current, body))]
pub async fn submit_quiz(
    State(state): State<AppState>,
    ApiUser(_current): ApiUser,
    Path(quiz_id): Path<i64>,
    body: Bytes,
) -> Result<Json<Score>, ApiError> {
    let quiz = services::load_quiz(state.repo.as_ref(), quiz_id)
        .await?
        .ok_or(AppError::NotFound("quiz"))?;
    let answers = parse_answers(&body);
    let score = score_submission(&quiz.questions, &answers);
    info!(quiz_id, score = score.score, total = score.total, "quiz scored");
    Ok(Json(score))
}
