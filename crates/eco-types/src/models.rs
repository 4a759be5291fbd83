use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public profile fields of the user who triggered a notification.
/// Embedded in every notification so clients can render it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
    pub id: String,
    pub name: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Message,
    EventInvite,
    MarketplaceOffer,
    BadgePurchase,
    AdminAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Message => "message",
            Self::EventInvite => "eventInvite",
            Self::MarketplaceOffer => "marketplaceOffer",
            Self::BadgePurchase => "badgePurchase",
            Self::AdminAlert => "adminAlert",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "like" => Self::Like,
            "comment" => Self::Comment,
            "follow" => Self::Follow,
            "message" => Self::Message,
            "eventInvite" => Self::EventInvite,
            "marketplaceOffer" => Self::MarketplaceOffer,
            "badgePurchase" => Self::BadgePurchase,
            "adminAlert" => Self::AdminAlert,
            other => return Err(UnknownKind(other.to_string())),
        })
    }
}

/// Reference to the thing a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Subject {
    Post(String),
    Event(String),
    Item(String),
    Message(String),
    Badge(String),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Event(_) => "event",
            Self::Item(_) => "item",
            Self::Message(_) => "message",
            Self::Badge(_) => "badge",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Post(id) | Self::Event(id) | Self::Item(id) | Self::Message(id) | Self::Badge(id) => id,
        }
    }

    /// Rebuild a subject from its stored (kind, id) columns.
    pub fn from_parts(kind: &str, id: String) -> Result<Self, UnknownKind> {
        Ok(match kind {
            "post" => Self::Post(id),
            "event" => Self::Event(id),
            "item" => Self::Item(id),
            "message" => Self::Message(id),
            "badge" => Self::Badge(id),
            other => return Err(UnknownKind(other.to_string())),
        })
    }
}

/// A notification that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: String,
    pub actor: ActorProfile,
    pub kind: NotificationKind,
    pub subject: Option<Subject>,
    pub message: Option<String>,
}

/// The durable notification record. This is the system of record;
/// realtime delivery is only a latency optimisation on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub actor: ActorProfile,
    pub kind: NotificationKind,
    pub subject: Option<Subject>,
    pub message: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
