use axum::{
    Json,
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use eco_gateway::connection::{self, handshake_user_id};
use eco_types::api::OnlineUsersResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{decode_claims, session_token};

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

pub async fn online_users(State(state): State<AppState>) -> Json<OnlineUsersResponse> {
    Json(OnlineUsersResponse {
        user_ids: state.dispatcher.online_users(),
    })
}

/// Decide which user a gateway connection registers as.
///
/// Without a session token the `userId` query parameter is taken as is.
/// With one, the token must be valid and `userId`, if given, must name the
/// token's subject; a missing `userId` falls back to the subject.
pub fn gateway_identity(
    secret: &str,
    headers: &HeaderMap,
    requested: Option<String>,
) -> Result<Option<String>, ApiError> {
    let requested = handshake_user_id(requested);
    let Some(token) = session_token(headers) else {
        return Ok(requested);
    };

    let claims = decode_claims(secret, &token)?;
    match requested {
        Some(uid) if uid != claims.sub => {
            warn!("gateway handshake for {} rejected: token belongs to {}", uid, claims.sub);
            Err(ApiError::Forbidden("userId does not match session".into()))
        }
        _ => Ok(Some(claims.sub)),
    }
}

/// Upgrade to the realtime gateway. A registered user id makes the
/// connection reachable for directed delivery; without one the client only
/// sees broadcasts.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user_id = gateway_identity(&state.jwt_secret, &headers, query.user_id)?;
    let dispatcher = state.dispatcher.clone();
    let config = state.gateway.clone();
    Ok(ws
        .on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, config, user_id))
        .into_response())
}
