use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use eco_db::models::PageCursor;
use eco_types::api::{
    Claims, CreateNotificationRequest, MarkReadRequest, MarkReadResponse, UnreadCountResponse,
};
use eco_types::models::{ActorProfile, NewNotification, Notification, NotificationKind};

use crate::auth::AppState;
use crate::error::ApiError;

const MAX_MESSAGE_CHARS: usize = 500;

/// Upper bound on ids per mark-read call; each id is one bound SQL parameter.
pub const MAX_MARK_READ_IDS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: the `createdAt` of the oldest notification on the previous page.
    pub before: Option<DateTime<Utc>>,
    /// The `id` of that notification, to page through equal timestamps.
    #[serde(rename = "beforeId")]
    pub before_id: Option<Uuid>,
}

fn default_limit() -> u32 {
    20
}

/// Run blocking store work off the async runtime.
async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let limit = query.limit.clamp(1, 100);
    let db = state.db.clone();
    let recipient = claims.sub;
    let cursor = match (query.before, query.before_id) {
        (Some(created_at), id) => Some(PageCursor { created_at, id }),
        (None, Some(_)) => return Err(ApiError::BadRequest("beforeId requires before".into())),
        (None, None) => None,
    };

    let rows = blocking(move || db.list_notifications(&recipient, limit, cursor)).await?;

    let notifications = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            row.into_notification()
                .map_err(|e| warn!("Skipping corrupt notification '{}': {:#}", id, e))
                .ok()
        })
        .collect();

    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let db = state.db.clone();
    let count = blocking(move || db.unread_count(&claims.sub)).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Store a notification from the caller to `recipientId` and push it live.
/// Notifying yourself is accepted and ignored.
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<Response, ApiError> {
    let recipient_id = req.recipient_id.trim().to_string();
    if recipient_id.is_empty() {
        return Err(ApiError::BadRequest("recipientId is required".into()));
    }
    if req
        .message
        .as_deref()
        .is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS)
    {
        return Err(ApiError::BadRequest(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    if req.kind == NotificationKind::AdminAlert && !claims.is_admin {
        return Err(ApiError::Forbidden("admin alerts require an admin account".into()));
    }

    let new = NewNotification {
        recipient_id,
        actor: ActorProfile {
            id: claims.sub,
            name: claims.name,
            profile_image: claims.profile_image,
        },
        kind: req.kind,
        subject: req.subject,
        message: req.message,
    };

    let notifier = state.notifier.clone();
    match blocking(move || notifier.notify(new)).await? {
        Some(notification) => Ok((StatusCode::CREATED, Json(notification)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    if req.ids.as_ref().is_some_and(|ids| ids.len() > MAX_MARK_READ_IDS) {
        return Err(ApiError::BadRequest(format!(
            "at most {} ids per request",
            MAX_MARK_READ_IDS
        )));
    }
    let db = state.db.clone();
    let updated = blocking(move || db.mark_read(&claims.sub, req.ids.as_deref())).await?;
    Ok(Json(MarkReadResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.clone();
    let deleted = blocking(move || db.delete_notification(&claims.sub, id)).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("notification {}", id)))
    }
}
