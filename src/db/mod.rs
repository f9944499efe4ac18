use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::PgPoolOptions,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::config::{AppConfig, DatabaseBackend};

#[cfg(test)]
mod conformance;
pub mod dialect;
mod postgres;
mod queries;
pub mod repo_types;
mod sqlite;

pub use postgres::PgRepository;
pub use repo_types::{
    AnswerOption, Avatar, AvatarChanges, NewQuestion, NewQuiz, Question, Quiz, QuizChanges, User,
};
pub use sqlite::SqliteRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A unique constraint rejected the write.
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    /// Maps unique violations to `Duplicate`, everything else passes through.
    pub(crate) fn from_write(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            _ => RepoError::Database(e),
        }
    }
}

/// Storage operations for every entity of the service.
///
/// Two implementations exist, one per SQL backend; [`connect`] picks one
/// at startup and the rest of the service only sees `Arc<dyn Repository>`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates the five tables if they do not exist.
    async fn migrate(&self) -> RepoResult<()>;
    async fn ping(&self) -> RepoResult<()>;

    // users
    async fn user_by_id(&self, id: i64) -> RepoResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Fails with [`RepoError::Duplicate`] when the username or email is taken.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str)
        -> RepoResult<User>;
    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> RepoResult<()>;

    // avatars
    async fn avatar_for_user(&self, user_id: i64) -> RepoResult<Option<Avatar>>;
    /// Inserts an empty avatar unless one exists, then returns it.
    async fn ensure_avatar(&self, user_id: i64) -> RepoResult<Avatar>;
    async fn update_avatar(&self, user_id: i64, changes: &AvatarChanges) -> RepoResult<Avatar>;

    // quizzes
    async fn create_quiz(&self, quiz: &NewQuiz) -> RepoResult<Quiz>;
    async fn quiz_by_id(&self, id: i64) -> RepoResult<Option<Quiz>>;
    async fn quizzes_by_creator(&self, user_id: i64) -> RepoResult<Vec<Quiz>>;
    async fn public_quizzes(&self) -> RepoResult<Vec<Quiz>>;
    async fn update_quiz(&self, id: i64, changes: &QuizChanges) -> RepoResult<Option<Quiz>>;
    /// Removes the quiz together with its questions and favorites.
    async fn delete_quiz(&self, id: i64) -> RepoResult<()>;

    // questions
    async fn create_question(&self, question: &NewQuestion) -> RepoResult<Question>;
    async fn question_by_id(&self, id: i64) -> RepoResult<Option<Question>>;
    async fn questions_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Question>>;
    async fn delete_question(&self, id: i64) -> RepoResult<()>;

    // favorites
    async fn is_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<bool>;
    /// No-op when the pair already exists.
    async fn add_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<()>;
    async fn remove_favorite(&self, user_id: i64, quiz_id: i64) -> RepoResult<()>;
    async fn favorites_for_user(&self, user_id: i64) -> RepoResult<Vec<Quiz>>;
}

/// Opens the backend named by the configuration.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn Repository>> {
    let repo: Arc<dyn Repository> = match &config.database {
        DatabaseBackend::Postgres { url } => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
                .context("connect to postgres")?;
            tracing::info!("using postgres backend");
            Arc::new(PgRepository::new(pool))
        }
        DatabaseBackend::Sqlite { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create database directory {}", parent.display()))?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await
                .with_context(|| format!("open sqlite database {}", path.display()))?;
            tracing::info!(path = %path.display(), "using sqlite backend");
            Arc::new(SqliteRepository::new(pool))
        }
    };
    Ok(repo)
}
