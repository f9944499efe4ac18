use async_trait::async_trait;
use sqlx::SqlitePool;

use super::queries as q;
use super::repo_types::{map_rows, AvatarRow, QuestionRow, QuizRow, UserRow};
use super::{
    Avatar, AvatarChanges, NewQuestion, NewQuiz, Question, Quiz, QuizChanges, RepoError,
    RepoResult, Repository, User,
};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS avatars (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER UNIQUE NOT NULL,
        outfit TEXT,
        accessory TEXT,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quizzes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        is_public BOOLEAN NOT NULL DEFAULT 0,
        created_by INTEGER NOT NULL,
        cover_image_url TEXT,
        FOREIGN KEY(created_by) REFERENCES users(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quiz_id INTEGER NOT NULL,
        question_text TEXT NOT NULL,
        option_a TEXT,
        option_b TEXT,
        option_c TEXT,
        option_d TEXT,
        correct_option TEXT,
        FOREIGN KEY(quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        quiz_id INTEGER NOT NULL,
        UNIQUE(user_id, quiz_id),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
    )
    "#,
];

const ENSURE_AVATAR: &str =
    "INSERT OR IGNORE INTO avatars (user_id, outfit, accessory) VALUES (?, NULL, NULL)";
const ADD_FAVORITE: &str = "INSERT OR IGNORE INTO favorites (user_id, quiz_id) VALUES (?, ?)";

/// File-based backend.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn migrate(&self) -> RepoResult<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query(q::PING).execute(&self.pool).await?;
        Ok(())
    }

    async fn user_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(q::USER_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(q::USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(q::USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(q::INSERT_USER)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::from_write)?;
        Ok(row.into())
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> RepoResult<()> {
        sqlx::query(q::UPDATE_PASSWORD_HASH)
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn avatar_for_user(&self, user_id: i64) -> RepoResult<Option<Avatar>> {
        let row = sqlx::query_as::<_, AvatarRow>(q::AVATAR_BY_USER)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Avatar::from))
    }

    async fn ensure_avatar(&self, user_id: i64) -> RepoResult<Avatar> {
        sqlx::query(ENSURE_AVATAR)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query_as::<_, AvatarRow>(q::AVATAR_BY_USER)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_avatar(&self, user_id: i64, changes: &AvatarChanges) -> RepoResult<Avatar> {
        self.ensure_avatar(user_id).await?;
        sqlx::query(q::UPDATE_AVATAR)
            .bind(changes.outfit.as_deref())
            .bind(changes.accessory.as_deref())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query_as::<_, AvatarRow>(q::AVATAR_BY_USER)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn create_quiz(&self, quiz: &NewQuiz) -> RepoResult<Quiz> {
        let row = sqlx::query_as::<_, QuizRow>(q::INSERT_QUIZ)
            .bind(&quiz.title)
            .bind(quiz.description.as_deref())
            .bind(quiz.is_public)
            .bind(quiz.created_by)
            .bind(quiz.cover_image_url.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::from_write)?;
        Ok(row.into())
    }

    async fn quiz_by_id(&self, id: i64) -> RepoResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(q::QUIZ_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::from))
    }

    async fn quizzes_by_creator(&self, user_id: i64) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(q::QUIZZES_BY_CREATOR)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn public_quizzes(&self) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(q::PUBLIC_QUIZZES)
            .bind(true)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn update_quiz(&self, id: i64, changes: &QuizChanges) -> RepoResult<Option<Quiz>> {
        sqlx::query(q::UPDATE_QUIZ)
            .bind(changes.title.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.is_public)
            .bind(changes.cover_image_url.as_deref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.quiz_by_id(id).await
    }

    async fn delete_quiz(&self, id: i64) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        for stmt in [
            q::DELETE_QUESTIONS_OF_QUIZ,
            q::DELETE_FAVORITES_OF_QUIZ,
            q::DELETE_QUIZ,
        ] {
            sqlx::query(stmt).bind(id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_question(&self, question: &NewQuestion) -> RepoResult<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(q::INSERT_QUESTION)
            .bind(question.quiz_id)
            .bind(&question.question_text)
            .bind(question.option_a.as_deref())
            .bind(question.option_b.as_deref())
            .bind(question.option_c.as_deref())
            .bind(question.option_d.as_deref())
            .bind(question.correct_option.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::from_write)?;
        Ok(row.into())
    }

    async fn question_by_id(&self, id: i64) -> RepoResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(q::QUESTION_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn questions_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(q::QUESTIONS_FOR_QUIZ)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn delete_question(&self, id: i64) -> RepoResult<()> {
        sqlx::query(q::DELETE_QUESTION)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<bool> {
        let count: i64 = sqlx::query_scalar(q::FAVORITE_EXISTS)
            .bind(user_id)
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn add_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<()> {
        sqlx::query(ADD_FAVORITE)
            .bind(user_id)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<()> {
        sqlx::query(q::DELETE_FAVORITE)
            .bind(user_id)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn favorites_for_user(&self, user_id: i64) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(q::FAVORITES_FOR_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }
}
