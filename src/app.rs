use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::identity::{resolve_identity, MaybeUser};
use crate::state::AppState;
use crate::{auth, profile, quizzes};

pub fn build_app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .merge(auth::router())
        .merge(profile::router())
        .merge(quizzes::router())
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn home(MaybeUser(current): MaybeUser) -> Json<serde_json::Value> {
    Json(json!({ "username": current.map(|c| c.user.username) }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.repo.ping().await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::tokens::TokenKeys;
    use crate::mail::fakes::RecordingMailer;
    use crate::state::test_support::fake_state;

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let resp = build_app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn home_names_the_signed_in_user() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let user = state
            .repo
            .create_user("ana", "ana@example.com", "hash")
            .await
            .unwrap();
        let token = TokenKeys::from_ref(&state).sign_session(user.id).unwrap();
        let app = build_app(state);

        let resp = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, json!({"username": null}));

        let resp = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, format!("session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, json!({"username": "ana"}));

        let resp = app
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, "session=tampered")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, json!({"username": null}));
    }

    #[tokio::test]
    async fn session_of_deleted_user_is_anonymous() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let token = TokenKeys::from_ref(&state).sign_session(4242).unwrap();
        let resp = build_app(state)
            .oneshot(
                Request::get("/dashboard/profile")
                    .header(header::COOKIE, format!("session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn uploaded_files_are_served_from_static() {
        let (state, _dir) = fake_state(Arc::new(RecordingMailer::default()), false).await;
        let url = state
            .uploads
            .save_image("cover.png", bytes::Bytes::from_static(b"img"))
            .await
            .unwrap()
            .unwrap();
        let resp = build_app(state)
            .oneshot(Request::get(url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"img");
    }
}
