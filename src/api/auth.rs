use axum::{
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::RpcError;
use super::rpc::reply;
use crate::domain::{UpsertUser, User};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{
    create_session_token, decode_session_token, expired_session_cookie, session_token,
};

/// Login callback: records the sign-in and issues a session token for it.
pub async fn sign_in(state: &AppState, input: UpsertUser) -> Result<(User, String), RpcError> {
    let user = state.users.upsert_user(input).await?;
    let token = create_session_token(&user.open_id, &state.config.jwt_secret)
        .map_err(RpcError::Internal)?;
    Ok((user, token))
}

/// The signed-in user, if the request carries a valid session.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, RpcError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let claims = match decode_session_token(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring invalid session token: {}", e);
            return Ok(None);
        }
    };

    Ok(state.users.find_by_open_id(&claims.sub).await?)
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, RpcError> {
    match current_user(state, headers).await? {
        None => Err(RpcError::Unauthorized("Please login".to_string())),
        Some(user) if user.is_admin() => Ok(user),
        Some(user) => {
            tracing::warn!("User {} attempted an admin procedure", user.open_id);
            Err(RpcError::Forbidden)
        }
    }
}

pub async fn me(state: &AppState, headers: &HeaderMap) -> Response {
    let user = current_user(state, headers).await.unwrap_or_else(|e| {
        tracing::warn!("Failed to resolve session user: {}", e);
        None
    });
    reply(user)
}

pub fn logout() -> Response {
    ([(header::SET_COOKIE, expired_session_cookie())], reply(json!({ "success": true })))
        .into_response()
}
