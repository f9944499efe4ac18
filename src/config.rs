use std::path::PathBuf;

use serde::Deserialize;

use crate::storage::UPLOAD_SUBDIR;

const DEFAULT_SECRET: &str = "default_local_key";

/// Which SQL engine backs the repository. Decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite { path: PathBuf },
    Postgres { url: String },
}

impl DatabaseBackend {
    /// `postgres://` and `postgresql://` URLs select PostgreSQL, `sqlite:` URLs
    /// select a SQLite file, anything else falls back to the local file.
    pub fn from_url(url: Option<&str>, fallback: PathBuf) -> Self {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) if u.starts_with("postgres://") || u.starts_with("postgresql://") => {
                DatabaseBackend::Postgres { url: u.to_string() }
            }
            Some(u) if u.starts_with("sqlite:") => {
                let path = u.trim_start_matches("sqlite:").trim_start_matches("//");
                DatabaseBackend::Sqlite {
                    path: PathBuf::from(path),
                }
            }
            _ => DatabaseBackend::Sqlite { path: fallback },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
}

impl MailConfig {
    /// Reset mails are only attempted when credentials are present.
    pub fn is_configured(&self) -> bool {
        matches!((&self.username, &self.password), (Some(u), Some(p)) if !u.is_empty() && !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseBackend,
    pub max_connections: u32,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
    pub public_base_url: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Uploads live inside the static tree so their public URLs resolve.
    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join(UPLOAD_SUBDIR)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseBackend::from_url(
            std::env::var("DATABASE_URL").ok().as_deref(),
            PathBuf::from("instance").join("local.db"),
        );

        let secret = std::env::var("SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!("SECRET_KEY not set; using the local development key");
            DEFAULT_SECRET.into()
        });
        let tokens = TokenConfig {
            secret,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "quizforge".into()),
            audience: std::env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| "quizforge-web".into()),
            session_ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24 * 7),
            reset_ttl_minutes: env_parse("RESET_TTL_MINUTES").unwrap_or(60),
        };

        let mail = MailConfig {
            server: std::env::var("MAIL_SERVER").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: env_parse("MAIL_PORT").unwrap_or(587),
            username: std::env::var("EMAIL_USER").ok(),
            password: std::env::var("EMAIL_PASS").ok(),
            from_name: std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Quizforge Support".into()),
        };

        let static_dir = PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into()));

        Ok(Self {
            database,
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(5),
            tokens,
            mail,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            static_dir,
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(2 * 1024 * 1024),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
