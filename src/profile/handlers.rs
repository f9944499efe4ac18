use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    auth::identity::{ApiUser, SignedIn},
    db::{Avatar, AvatarChanges},
    error::{ApiError, AppError},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/profile", get(profile))
        .route("/save_avatar", post(save_avatar))
}

#[derive(Debug, Serialize)]
pub struct AvatarView {
    pub accessory: Option<String>,
    pub outfit: Option<String>,
}

impl From<Avatar> for AvatarView {
    fn from(a: Avatar) -> Self {
        Self {
            accessory: a.accessory,
            outfit: a.outfit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    pub username: String,
    pub email: String,
    pub avatar: AvatarView,
}

#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub user: ProfileUser,
}

#[derive(Debug, Serialize)]
pub struct SavedAvatar {
    pub success: bool,
    pub avatar: AvatarView,
}

pub async fn dashboard(SignedIn(_): SignedIn) -> Redirect {
    Redirect::to("/dashboard/profile")
}

/// First visit creates the avatar row.
#[instrument(skip(state, current))]
pub async fn profile(
    State(state): State<AppState>,
    SignedIn(current): SignedIn,
) -> Result<Json<ProfileContext>, AppError> {
    let avatar = match current.avatar {
        Some(a) => a,
        None => state.repo.ensure_avatar(current.user.id).await?,
    };
    Ok(Json(ProfileContext {
        user: ProfileUser {
            username: current.user.username,
            email: current.user.email,
            avatar: avatar.into(),
        },
    }))
}

/// Avatar part names arrive as image file names; only the stem is kept.
/// Non-string JSON values are stored as their JSON text.
fn avatar_part(v: Option<&Value>) -> Option<String> {
    let text = match v? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(text.replace(".png", ""))
}

fn avatar_changes(body: &[u8]) -> AvatarChanges {
    let data = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Default::default(),
    };
    AvatarChanges {
        outfit: avatar_part(data.get("outfit")),
        accessory: avatar_part(data.get("accessory")),
    }
}

#[instrument(skip(state, current, body))]
pub async fn save_avatar(
    State(state): State<AppState>,
    ApiUser(current): ApiUser,
    body: Bytes,
) -> Result<Json<SavedAvatar>, ApiError> {
    let changes = avatar_changes(&body);
    let avatar = state.repo.update_avatar(current.user.id, &changes).await?;
    info!(user_id = current.user.id, "avatar saved");
    Ok(Json(SavedAvatar {
        success: true,
        avatar: avatar.into(),
    }))
}
