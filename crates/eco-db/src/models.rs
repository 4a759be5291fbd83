//! Database row types. These map directly to SQLite rows and stay
//! string-typed; conversion to eco-types models happens here so callers
//! never see raw columns.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use eco_types::models::{ActorProfile, NewNotification, Notification, Subject};

pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_image: Option<String>,
    pub kind: String,
    pub subject_kind: Option<String>,
    pub subject_id: Option<String>,
    pub message: Option<String>,
    pub read: bool,
    pub created_at: String,
}

/// Position after the last row of a page. Rows are ordered by
/// `(created_at, id)` descending, so `id` breaks timestamp ties; without it
/// the cursor only compares `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: Option<Uuid>,
}

/// Timestamps are stored as fixed-width RFC 3339 so that text ordering
/// matches time ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl NotificationRow {
    pub fn from_new(id: Uuid, new: &NewNotification, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            recipient_id: new.recipient_id.clone(),
            actor_id: new.actor.id.clone(),
            actor_name: new.actor.name.clone(),
            actor_image: new.actor.profile_image.clone(),
            kind: new.kind.as_str().to_string(),
            subject_kind: new.subject.as_ref().map(|s| s.kind().to_string()),
            subject_id: new.subject.as_ref().map(|s| s.id().to_string()),
            message: new.message.clone(),
            read: false,
            created_at: format_timestamp(created_at),
        }
    }

    pub fn into_notification(self) -> Result<Notification> {
        let id: Uuid = self
            .id
            .parse()
            .with_context(|| format!("corrupt notification id '{}'", self.id))?;

        let kind = self
            .kind
            .parse()
            .with_context(|| format!("notification {}", self.id))?;

        let subject = match (self.subject_kind, self.subject_id) {
            (Some(kind), Some(subject_id)) => Some(
                Subject::from_parts(&kind, subject_id)
                    .with_context(|| format!("notification {}", self.id))?,
            ),
            _ => None,
        };

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("corrupt created_at '{}' on notification {}", self.created_at, self.id))?
            .with_timezone(&Utc);

        Ok(Notification {
            id,
            recipient_id: self.recipient_id,
            actor: ActorProfile {
                id: self.actor_id,
                name: self.actor_name,
                profile_image: self.actor_image,
            },
            kind,
            subject,
            message: self.message,
            read: self.read,
            created_at,
        })
    }
}
