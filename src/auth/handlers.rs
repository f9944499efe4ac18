use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{ForgotForm, FormContext, LoginForm, RegisterForm, ResetForm},
        identity::{expired_session_cookie, session_cookie},
        services::{self, RegisterError, ResetError},
        tokens::TokenKeys,
    },
    error::AppError,
    state::AppState,
};

const LOGIN_FAILED: &str = "Invalid login. Try again.";
const RESET_SENT: &str = "If this email exists, we sent a link to reset your password.";

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout))
        .route("/forgot", get(forgot_form).post(forgot))
        .route("/reset/:token", get(reset_form).post(reset))
}

fn blank_form() -> Json<FormContext> {
    Json(FormContext::default())
}

async fn login_form() -> Json<FormContext> {
    blank_form()
}

#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some(user) =
        services::authenticate(state.repo.as_ref(), &form.identifier, &form.password).await?
    else {
        warn!("login rejected");
        return Ok(Json(FormContext::message(LOGIN_FAILED)).into_response());
    };

    let token = TokenKeys::from_ref(&state).sign_session(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok((jar.add(session_cookie(token)), Redirect::to("/dashboard/profile")).into_response())
}

async fn register_form() -> Json<FormContext> {
    blank_form()
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match services::register(state.repo.as_ref(), &form.username, &form.email, &form.password)
        .await
    {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(RegisterError::Repo(e)) => Err(e.into()),
        Err(RegisterError::Internal(e)) => Err(e.into()),
        Err(rejected) => {
            warn!(reason = %rejected, "registration rejected");
            Ok(Json(FormContext::message(rejected.to_string())).into_response())
        }
    }
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(expired_session_cookie()), Redirect::to("/"))
}

async fn forgot_form() -> Json<FormContext> {
    blank_form()
}

#[instrument(skip(state, form))]
pub async fn forgot(State(state): State<AppState>, Form(form): Form<ForgotForm>) -> Json<FormContext> {
    services::request_password_reset(&state, &form.email).await;
    Json(FormContext::message(RESET_SENT))
}

/// Link problems and a vanished account answer with bare text; a missing
/// password goes back into the form.
fn reset_failure(e: ResetError) -> Result<Response, AppError> {
    match e {
        ResetError::Repo(e) => Err(e.into()),
        ResetError::Internal(e) => Err(e.into()),
        ResetError::EmptyPassword => Ok(Json(FormContext::message(e.to_string())).into_response()),
        ResetError::Expired | ResetError::InvalidLink | ResetError::UnknownUser => {
            Ok(e.to_string().into_response())
        }
    }
}

#[instrument(skip_all)]
pub async fn reset_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match services::check_reset_token(&TokenKeys::from_ref(&state), &token) {
        Ok(_) => Ok(blank_form().into_response()),
        Err(e) => reset_failure(e),
    }
}

#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> Result<Response, AppError> {
    let keys = TokenKeys::from_ref(&state);
    match services::reset_password(state.repo.as_ref(), &keys, &token, &form.password).await {
        Ok(()) => Ok(Redirect::to("/login").into_response()),
        Err(e) => reset_failure(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::mail::fakes::RecordingMailer;
    use crate::state::test_support::fake_state;

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn register_then_login_sets_session_cookie() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let app = account_routes().with_state(state);

        let resp = app
            .clone()
            .oneshot(form_post(
                "/register",
                "username=ana&email=ana%40example.com&password=pw",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");

        let resp = app
            .oneshot(form_post("/login", "identifier=ana&password=pw"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/dashboard/profile");
        let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn bad_credentials_and_duplicates_come_back_as_messages() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        services::register(state.repo.as_ref(), "ana", "ana@example.com", "pw")
            .await
            .unwrap();
        let app = account_routes().with_state(state);

        let resp = app
            .clone()
            .oneshot(form_post("/login", "identifier=ana&password=nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["message"], LOGIN_FAILED);

        let resp = app
            .clone()
            .oneshot(form_post(
                "/register",
                "username=ana&email=new%40example.com&password=pw",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["message"], "Username already exists.");

        let resp = app
            .oneshot(form_post("/register", "username=bob&email=&password=pw"))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["message"], "Please fill in all fields.");
    }

    #[tokio::test]
    async fn forgot_answers_the_same_even_when_mail_fails() {
        let mailer = Arc::new(RecordingMailer::failing());
        let (state, _dir) = fake_state(mailer, true).await;
        services::register(state.repo.as_ref(), "ana", "ana@example.com", "pw")
            .await
            .unwrap();
        let app = account_routes().with_state(state);

        for email in ["ana%40example.com", "ghost%40example.com"] {
            let resp = app
                .clone()
                .oneshot(form_post("/forgot", &format!("email={email}")))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(json_body(resp).await["message"], RESET_SENT);
        }
    }

    #[tokio::test]
    async fn reset_link_states() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), true).await;
        services::register(state.repo.as_ref(), "ana", "ana@example.com", "pw")
            .await
            .unwrap();
        let token = TokenKeys::from_ref(&state).sign_reset("ana@example.com").unwrap();
        let app = account_routes().with_state(state);

        let resp = app
            .clone()
            .oneshot(Request::get("/reset/not-a-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(text_body(resp).await, "Invalid link.");

        let resp = app
            .clone()
            .oneshot(form_post(&format!("/reset/{token}"), "password="))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["message"], "Enter a new password.");

        let resp = app
            .oneshot(form_post(&format!("/reset/{token}"), "password=fresh"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let app = account_routes().with_state(state);
        let resp = app
            .oneshot(
                Request::get("/logout")
                    .header(header::COOKIE, "session=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/");
        let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("Max-Age=0"));
    }
}
