use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use eco_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Session cookie set by the main web app.
pub const SESSION_COOKIE: &str = "jwt";

/// Token from the Authorization header, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
}

pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

/// Validate the session token and store its claims as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let claims = decode_claims(&state.jwt_secret, &token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
