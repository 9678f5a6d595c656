use axum::response::Response;
use serde_json::Value;

use super::RpcError;
use super::rpc::{IdInput, positive_id, reply, require_input};
use crate::infrastructure::AppState;

pub async fn get_all(state: &AppState) -> Response {
    reply(state.catalog.list_editions().await)
}

pub async fn get_by_id(state: &AppState, input: Option<Value>) -> Result<Response, RpcError> {
    let IdInput { id } = require_input(input)?;
    let id = positive_id("id", id)?;
    Ok(reply(state.catalog.get_edition(id).await))
}
