use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{config::TokenConfig, state::AppState};

/// Purpose of a token. Doubles as the salt separating session cookies from
/// password-reset links: a token of one kind never verifies as the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    PasswordReset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // user id for sessions, email for resets
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        TokenKeys::new(&state.config.tokens)
    }
}

impl TokenKeys {
    pub fn new(cfg: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: Duration::from_secs((cfg.session_ttl_minutes.max(0) as u64) * 60),
            reset_ttl: Duration::from_secs((cfg.reset_ttl_minutes.max(0) as u64) * 60),
        }
    }

    fn sign_at(&self, sub: String, kind: TokenKind, now: OffsetDateTime) -> anyhow::Result<String> {
        let ttl = match kind {
            TokenKind::Session => self.session_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(kind = ?kind, "token signed");
        Ok(token)
    }

    pub fn sign_session(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(user_id.to_string(), TokenKind::Session, OffsetDateTime::now_utc())
    }

    /// Time-limited reset token embedding `email`.
    pub fn sign_reset(&self, email: &str) -> anyhow::Result<String> {
        self.sign_at(email.to_string(), TokenKind::PasswordReset, OffsetDateTime::now_utc())
    }

    fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        if data.claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }

    /// User id carried by a session token.
    pub fn verify_session(&self, token: &str) -> Result<i64, TokenError> {
        let claims = self.verify_kind(token, TokenKind::Session)?;
        claims.sub.parse().map_err(|_| TokenError::Invalid)
    }

    /// Email carried by a password-reset token.
    pub fn verify_reset(&self, token: &str) -> Result<String, TokenError> {
        Ok(self.verify_kind(token, TokenKind::PasswordReset)?.sub)
    }
}
