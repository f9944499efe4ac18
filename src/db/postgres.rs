use async_trait::async_trait;
use sqlx::PgPool;

use super::dialect::numbered_placeholders as pg;
use super::queries as q;
use super::repo_types::{map_rows, AvatarRow, QuestionRow, QuizRow, UserRow};
use super::{
    Avatar, AvatarChanges, NewQuestion, NewQuiz, Question, Quiz, QuizChanges, RepoError,
    RepoResult, Repository, User,
};

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS avatars (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT UNIQUE NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        outfit TEXT,
        accessory TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quizzes (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        is_public BOOLEAN NOT NULL DEFAULT FALSE,
        created_by BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        cover_image_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id BIGSERIAL PRIMARY KEY,
        quiz_id BIGINT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
        question_text TEXT NOT NULL,
        option_a TEXT,
        option_b TEXT,
        option_c TEXT,
        option_d TEXT,
        correct_option TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        quiz_id BIGINT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
        UNIQUE(user_id, quiz_id)
    )
    "#,
];

const ENSURE_AVATAR: &str = r#"
    INSERT INTO avatars (user_id, outfit, accessory)
    VALUES ($1, NULL, NULL)
    ON CONFLICT (user_id) DO NOTHING
"#;
const ADD_FAVORITE: &str = r#"
    INSERT INTO favorites (user_id, quiz_id)
    VALUES ($1, $2)
    ON CONFLICT DO NOTHING
"#;

/// Server-based backend.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_avatar(&self, user_id: i64) -> RepoResult<Avatar> {
        let sql = pg(q::AVATAR_BY_USER);
        let row = sqlx::query_as::<_, AvatarRow>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl Repository for PgRepository {
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
        let sql = pg(q::USER_BY_ID);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = pg(q::USER_BY_USERNAME);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = pg(q::USER_BY_EMAIL);
        let row = sqlx::query_as::<_, UserRow>(&sql)
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
        let sql = pg(q::INSERT_USER);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::from_write)?;
        Ok(row.into())
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> RepoResult<()> {
        let sql = pg(q::UPDATE_PASSWORD_HASH);
        sqlx::query(&sql)
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn avatar_for_user(&self, user_id: i64) -> RepoResult<Option<Avatar>> {
        let sql = pg(q::AVATAR_BY_USER);
        let row = sqlx::query_as::<_, AvatarRow>(&sql)
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
        self.fetch_avatar(user_id).await
    }

    async fn update_avatar(&self, user_id: i64, changes: &AvatarChanges) -> RepoResult<Avatar> {
        self.ensure_avatar(user_id).await?;
        let sql = pg(q::UPDATE_AVATAR);
        sqlx::query(&sql)
            .bind(changes.outfit.as_deref())
            .bind(changes.accessory.as_deref())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.fetch_avatar(user_id).await
    }

    async fn create_quiz(&self, quiz: &NewQuiz) -> RepoResult<Quiz> {
        let sql = pg(q::INSERT_QUIZ);
        let row = sqlx::query_as::<_, QuizRow>(&sql)
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
        let sql = pg(q::QUIZ_BY_ID);
        let row = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::from))
    }

    async fn quizzes_by_creator(&self, user_id: i64) -> RepoResult<Vec<Quiz>> {
        let sql = pg(q::QUIZZES_BY_CREATOR);
        let rows = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn public_quizzes(&self) -> RepoResult<Vec<Quiz>> {
        let sql = pg(q::PUBLIC_QUIZZES);
        let rows = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(true)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn update_quiz(&self, id: i64, changes: &QuizChanges) -> RepoResult<Option<Quiz>> {
        let sql = pg(q::UPDATE_QUIZ);
        sqlx::query(&sql)
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
            let sql = pg(stmt);
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_question(&self, question: &NewQuestion) -> RepoResult<Question> {
        let sql = pg(q::INSERT_QUESTION);
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
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
        let sql = pg(q::QUESTION_BY_ID);
        let row = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }

    async fn questions_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Question>> {
        let sql = pg(q::QUESTIONS_FOR_QUIZ);
        let rows = sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(quiz_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }

    async fn delete_question(&self, id: i64) -> RepoResult<()> {
        let sql = pg(q::DELETE_QUESTION);
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn is_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<bool> {
        let sql = pg(q::FAVORITE_EXISTS);
        let count: i64 = sqlx::query_scalar(&sql)
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
        let sql = pg(q::DELETE_FAVORITE);
        sqlx::query(&sql)
            .bind(user_id)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn favorites_for_user(&self, user_id: i64) -> RepoResult<Vec<Quiz>> {
        let sql = pg(q::FAVORITES_FOR_USER);
        let rows = sqlx::query_as::<_, QuizRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(map_rows(rows))
    }
}
