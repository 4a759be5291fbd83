//! Assembles the REST routes and the websocket gateway into one [`Router`].

use axum::{
    Router, middleware,
    routing::{delete, get, patch},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AppState;
use crate::middleware::require_auth;
use crate::{notifications, presence};

/// Routes:
/// - `GET /gateway?userId=` -- websocket upgrade (unauthenticated)
/// - `GET|POST /notifications`
/// - `GET /notifications/unread-count`
/// - `PATCH /notifications/read`
/// - `DELETE /notifications/{id}`
/// - `GET /users/online`
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read", patch(notifications::mark_read))
        .route("/notifications/{id}", delete(notifications::delete_notification))
        .route("/users/online", get(presence::online_users))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(presence::ws_upgrade))
        .with_state(state);

    Router::new()
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
