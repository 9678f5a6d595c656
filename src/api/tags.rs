use axum::response::Response;

use super::rpc::reply;
use crate::infrastructure::AppState;

pub async fn get_all(state: &AppState) -> Response {
    reply(state.catalog.list_tags().await)
}
