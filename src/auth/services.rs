use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    password::{hash_password, verify_password},
    tokens::{TokenError, TokenKeys},
};
use crate::{
    db::{RepoError, RepoResult, Repository, User},
    mail::OutgoingMail,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration outcome other than success. The first four variants are shown
/// back to the visitor; the last two are infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Invalid email.")]
    InvalidEmail,
    #[error("Username already exists.")]
    UsernameTaken,
    #[error("Email already registered.")]
    EmailTaken,
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepoError> for RegisterError {
    /// A unique violation here means another request won the race for the
    /// same username or email after our pre-checks.
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate(msg) if msg.contains("email") => RegisterError::EmailTaken,
            RepoError::Duplicate(_) => RegisterError::UsernameTaken,
            other => RegisterError::Repo(other),
        }
    }
}

/// Creates an account. Username is trimmed, email trimmed and lowercased.
pub async fn register(
    repo: &dyn Repository,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, RegisterError> {
    let username = username.trim();
    let email = email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(RegisterError::MissingFields);
    }
    if !is_valid_email(&email) {
        return Err(RegisterError::InvalidEmail);
    }
    if repo.user_by_username(username).await?.is_some() {
        return Err(RegisterError::UsernameTaken);
    }
    if repo.user_by_email(&email).await?.is_some() {
        return Err(RegisterError::EmailTaken);
    }

    let hash = hash_password(password)?;
    let user = repo.create_user(username, &email, &hash).await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Looks the identifier up as a username first, then as an email.
pub async fn authenticate(
    repo: &dyn Repository,
    identifier: &str,
    password: &str,
) -> RepoResult<Option<User>> {
    let identifier = identifier.trim();
    let user = match repo.user_by_username(identifier).await? {
        Some(u) => Some(u),
        None => repo.user_by_email(&identifier.to_lowercase()).await?,
    };
    let Some(user) = user else {
        debug!("login for unknown identifier");
        return Ok(None);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => Ok(Some(user)),
        Ok(false) => Ok(None),
        Err(e) => {
            warn!(error = %e, user_id = user.id, "stored password hash unreadable");
            Ok(None)
        }
    }
}

pub fn reset_url(base_url: &str, token: &str) -> String {
    format!("{}/reset/{}", base_url.trim_end_matches('/'), token)
}

/// Sends a reset link when the address belongs to an account and mail is
/// configured. Never reports anything back so callers can answer the same
/// way for every address.
pub async fn request_password_reset(state: &AppState, email: &str) {
    let email = email.trim().to_lowercase();

    if !state.config.mail.is_configured() {
        debug!("mail not configured; skipping reset mail");
        return;
    }

    match state.repo.user_by_email(&email).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!("reset requested for unknown email");
            return;
        }
        Err(e) => {
            warn!(error = %e, "reset lookup failed");
            return;
        }
    }

    let token = match TokenKeys::from_ref(state).sign_reset(&email) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "could not sign reset token");
            return;
        }
    };
    let link = reset_url(&state.config.public_base_url, &token);
    let mail = OutgoingMail {
        to: email,
        subject: "Password recovery".into(),
        body: format!("Click the link to reset your password: {link}\nAutomatic message."),
    };
    if let Err(e) = state.mailer.send(mail).await {
        warn!(error = %e, "reset mail failed");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Link expired.")]
    Expired,
    #[error("Invalid link.")]
    InvalidLink,
    #[error("Enter a new password.")]
    EmptyPassword,
    #[error("User not found.")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for ResetError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ResetError::Expired,
            TokenError::Invalid => ResetError::InvalidLink,
        }
    }
}

/// Email embedded in a still-valid reset token.
pub fn check_reset_token(keys: &TokenKeys, token: &str) -> Result<String, ResetError> {
    Ok(keys.verify_reset(token)?)
}

pub async fn reset_password(
    repo: &dyn Repository,
    keys: &TokenKeys,
    token: &str,
    new_password: &str,
) -> Result<(), ResetError> {
    let email = check_reset_token(keys, token)?;
    if new_password.is_empty() {
        return Err(ResetError::EmptyPassword);
    }
    let user = repo.user_by_email(&email).await?.ok_or(ResetError::UnknownUser)?;
    let hash = hash_password(new_password)?;
    repo.set_password_hash(user.id, &hash).await?;
    info!(user_id = user.id, "password reset");
    Ok(())
}
