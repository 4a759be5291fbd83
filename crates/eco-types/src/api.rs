use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationKind, Subject};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and anything that issues
/// tokens. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNotificationRequest {
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub subject: Option<Subject>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MarkReadRequest {
    /// Notifications to mark; `None` marks every notification of the caller.
    pub ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

// -- Presence --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersResponse {
    pub user_ids: Vec<String>,
}
