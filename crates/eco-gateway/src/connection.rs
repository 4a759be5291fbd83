use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use eco_types::events::{ClientCommand, ServerEvent};

use crate::dispatcher::{ConnectionHandle, Dispatcher};

/// Per-connection liveness settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How often `serverHeartbeat` is sent.
    pub heartbeat_interval: Duration,
    /// Drop the connection after this many unanswered heartbeats.
    /// `None` keeps silent connections registered until they close.
    pub max_missed_heartbeats: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            max_missed_heartbeats: None,
        }
    }
}

/// Normalise the `userId` handshake parameter. Clients without a session
/// send nothing, an empty string or the literal `undefined`.
pub fn handshake_user_id(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "undefined" && s != "null")
}

/// Drive one websocket connection until either side closes it.
///
/// Connections with a `user_id` are registered in the presence registry
/// for their lifetime; anonymous ones only receive broadcasts.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    config: GatewayConfig,
    user_id: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut direct_rx) = ConnectionHandle::new();
    let conn_id = handle.id();

    // Subscribe before registering so our own presence broadcast reaches us
    let mut broadcast_rx = dispatcher.subscribe();

    match &user_id {
        Some(uid) => {
            info!("{} connected to gateway (connection {})", uid, conn_id);
            dispatcher.register(uid, handle.clone());
        }
        None => {
            debug!("anonymous connection {} opened", conn_id);
            handle.send(ServerEvent::GetOnlineUsers(dispatcher.online_users()));
        }
    }

    let answered = Arc::new(AtomicBool::new(true));
    let answered_send = answered.clone();
    let answered_recv = answered.clone();

    // Forward broadcasts + directed events -> client, with heartbeat
    let heartbeat_interval = config.heartbeat_interval;
    let max_missed = config.max_missed_heartbeats;
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.tick().await;
        let mut missed: u32 = 0;

        loop {
            let event = tokio::select! {
                result = broadcast_rx.recv() => match result {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Broadcast receiver lagged by {} messages", n);
                        continue;
                    }
                    Err(_) => break,
                },
                result = direct_rx.recv() => match result {
                    Some(event) => event,
                    None => break,
                },
                _ = heartbeat.tick() => {
                    if answered_send.swap(false, Ordering::Acquire) {
                        missed = 0;
                    } else {
                        missed += 1;
                        if max_missed.is_some_and(|max| missed >= max) {
                            warn!("Heartbeat timeout (missed {}), dropping connection", missed);
                            break;
                        }
                    }
                    ServerEvent::ServerHeartbeat
                }
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {}: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read commands from client
    let dispatcher_recv = dispatcher.clone();
    let handle_recv = handle.clone();
    let user_id_recv = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => {
                        answered_recv.store(true, Ordering::Release);
                        handle_command(&dispatcher_recv, &handle_recv, user_id_recv.as_deref(), cmd);
                    }
                    Err(e) => {
                        warn!(
                            "connection {} bad command: {} -- raw: {}",
                            handle_recv.id(),
                            e,
                            truncate(&text, 200)
                        );
                    }
                },
                Message::Pong(_) => {
                    answered_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    match &user_id {
        Some(uid) => {
            dispatcher.deregister(uid, &handle);
            info!("{} disconnected from gateway (connection {})", uid, conn_id);
        }
        None => debug!("anonymous connection {} closed", conn_id),
    }
}

fn handle_command(
    dispatcher: &Dispatcher,
    handle: &ConnectionHandle,
    user_id: Option<&str>,
    cmd: ClientCommand,
) {
    match cmd {
        ClientCommand::RequestOnlineUsers => {
            handle.send(ServerEvent::GetOnlineUsers(dispatcher.online_users()));
        }
        ClientCommand::Heartbeat => {
            if let Some(uid) = user_id {
                dispatcher.touch(uid, handle);
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_user_id_filters_placeholders() {
        assert_eq!(handshake_user_id(Some("abc".into())), Some("abc".into()));
        assert_eq!(handshake_user_id(Some(" abc ".into())), Some("abc".into()));
        assert_eq!(handshake_user_id(Some("".into())), None);
        assert_eq!(handshake_user_id(Some("undefined".into())), None);
        assert_eq!(handshake_user_id(Some("null".into())), None);
        assert_eq!(handshake_user_id(None), None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn request_online_users_replies_on_same_connection() {
        let dispatcher = Dispatcher::default();
        let (alice, _alice_rx) = ConnectionHandle::new();
        dispatcher.register("alice", alice);

        let (anon, mut anon_rx) = ConnectionHandle::new();
        handle_command(&dispatcher, &anon, None, ClientCommand::RequestOnlineUsers);
        assert_eq!(
            anon_rx.try_recv().unwrap(),
            ServerEvent::GetOnlineUsers(vec!["alice".into()])
        );
    }

    #[test]
    fn heartbeat_touches_own_entry_only() {
        let dispatcher = Dispatcher::default();
        let (alice, _alice_rx) = ConnectionHandle::new();
        dispatcher.register("alice", alice.clone());
        let mut rx = dispatcher.subscribe();

        handle_command(&dispatcher, &alice, Some("alice"), ClientCommand::Heartbeat);
        handle_command(&dispatcher, &alice, None, ClientCommand::Heartbeat);

        assert!(dispatcher.is_online("alice"));
        assert!(rx.try_recv().is_err());
    }
}
