use serde::{Deserialize, Serialize};

use crate::models::{Notification, NotificationKind};

/// Events sent FROM server TO client over the websocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full set of currently registered user ids
    GetOnlineUsers(Vec<String>),

    /// Periodic liveness check, answered by `ClientCommand::Heartbeat`
    ServerHeartbeat,

    NewLike(Notification),
    NewComment(Notification),
    NewFollow(Notification),
    NewMessage(Notification),
    NewEventInvite(Notification),
    NewMarketplaceOffer(Notification),
    NewBadgePurchase(Notification),
    NewAdminAlert(Notification),
}

impl ServerEvent {
    /// Wrap a stored notification in the directed event for its kind.
    pub fn notification(notification: Notification) -> Self {
        match notification.kind {
            NotificationKind::Like => Self::NewLike(notification),
            NotificationKind::Comment => Self::NewComment(notification),
            NotificationKind::Follow => Self::NewFollow(notification),
            NotificationKind::Message => Self::NewMessage(notification),
            NotificationKind::EventInvite => Self::NewEventInvite(notification),
            NotificationKind::MarketplaceOffer => Self::NewMarketplaceOffer(notification),
            NotificationKind::BadgePurchase => Self::NewBadgePurchase(notification),
            NotificationKind::AdminAlert => Self::NewAdminAlert(notification),
        }
    }

    /// Wire name of the event, as it appears in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetOnlineUsers(_) => "getOnlineUsers",
            Self::ServerHeartbeat => "serverHeartbeat",
            Self::NewLike(_) => "newLike",
            Self::NewComment(_) => "newComment",
            Self::NewFollow(_) => "newFollow",
            Self::NewMessage(_) => "newMessage",
            Self::NewEventInvite(_) => "newEventInvite",
            Self::NewMarketplaceOffer(_) => "newMarketplaceOffer",
            Self::NewBadgePurchase(_) => "newBadgePurchase",
            Self::NewAdminAlert(_) => "newAdminAlert",
        }
    }
}

/// Commands sent FROM client TO server over the websocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Ask for a `GetOnlineUsers` reply on this connection
    RequestOnlineUsers,

    /// Answer to `ServerEvent::ServerHeartbeat`
    Heartbeat,
}
