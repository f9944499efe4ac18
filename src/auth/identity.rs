//! Resolves the acting user once per request and hands it to handlers.
//!
//! [`resolve_identity`] runs as middleware in front of every route and puts an
//! [`Identity`] into the request extensions. Handlers never look at cookies
//! themselves; they ask for one of the extractors below.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use tracing::{debug, warn};

use super::tokens::TokenKeys;
use crate::{
    db::{Avatar, User},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub avatar: Option<Avatar>,
}

/// Request-scoped result of the session lookup.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<CurrentUser>);

pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let current = match jar.get(SESSION_COOKIE) {
        Some(cookie) => load_current_user(&state, cookie.value()).await,
        None => None,
    };
    req.extensions_mut().insert(Identity(current));
    next.run(req).await
}

/// Any failure degrades to "no user".
async fn load_current_user(state: &AppState, token: &str) -> Option<CurrentUser> {
    let keys = TokenKeys::from_ref(state);
    let user_id = match keys.verify_session(token) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "ignoring session cookie");
            return None;
        }
    };

    let user = match state.repo.user_by_id(user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            debug!(user_id, "session refers to a missing user");
            return None;
        }
        Err(e) => {
            warn!(error = %e, user_id, "identity lookup failed");
            return None;
        }
    };

    let avatar = state.repo.avatar_for_user(user.id).await.unwrap_or_else(|e| {
        warn!(error = %e, user_id, "avatar lookup failed");
        None
    });

    Some(CurrentUser { user, avatar })
}

fn identity(parts: &Parts) -> Option<CurrentUser> {
    parts
        .extensions
        .get::<Identity>()
        .and_then(|i| i.0.clone())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Signed-in user if there is one.
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(identity(parts)))
    }
}

/// Page routes: anonymous visitors are sent to the login form.
pub struct SignedIn(pub CurrentUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SignedIn {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity(parts)
            .map(SignedIn)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

/// JSON routes: anonymous callers get a 401 body instead of a redirect.
pub struct ApiUser(pub CurrentUser);

pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "not authenticated" })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ApiUser {
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity(parts).map(ApiUser).ok_or(Unauthenticated)
    }
}
