use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;

use super::RpcError;
use super::auth::require_admin;
use super::rpc::{IdInput, parse_input, positive_id, reply, require_input};
use crate::domain::{BookUpdate, PublicBookFilter};
use crate::infrastructure::AppState;

pub const MAX_PAGE_LIMIT: i64 = 200;
pub const MAX_SEARCH_LEN: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBooksInput {
    pub edition_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PublicBooksInput {
    fn into_filter(self) -> Result<PublicBookFilter, RpcError> {
        let edition_id = self
            .edition_id
            .map(|id| positive_id("editionId", id))
            .transpose()?;
        let tag_id = self.tag_id.map(|id| positive_id("tagId", id)).transpose()?;

        if let Some(search) = &self.search
            && search.chars().count() > MAX_SEARCH_LEN
        {
            return Err(RpcError::Validation(format!(
                "search must be at most {} characters",
                MAX_SEARCH_LEN
            )));
        }

        let limit = match self.limit {
            Some(limit) if !(1..=MAX_PAGE_LIMIT).contains(&limit) => {
                return Err(RpcError::Validation(format!(
                    "limit must be between 1 and {}",
                    MAX_PAGE_LIMIT
                )));
            }
            limit => limit.map(|l| l as u64),
        };
        let offset = match self.offset {
            Some(offset) if offset < 0 => {
                return Err(RpcError::Validation("offset must not be negative".to_string()));
            }
            offset => offset.map(|o| o as u64),
        };

        Ok(PublicBookFilter {
            edition_id,
            tag_id,
            search: self.search,
            limit,
            offset,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookInput {
    pub id: i64,
    #[serde(default)]
    pub data: BookUpdate,
}

pub async fn get_public(state: &AppState, input: Option<Value>) -> Result<Response, RpcError> {
    let filter = parse_input::<PublicBooksInput>(input)?
        .map(PublicBooksInput::into_filter)
        .transpose()?;
    Ok(reply(state.catalog.list_public(filter).await))
}

pub async fn get_all(state: &AppState, headers: &HeaderMap) -> Result<Response, RpcError> {
    require_admin(state, headers).await?;
    Ok(reply(state.catalog.list_all().await))
}

pub async fn get_by_id(state: &AppState, input: Option<Value>) -> Result<Response, RpcError> {
    let IdInput { id } = require_input(input)?;
    let id = positive_id("id", id)?;
    Ok(reply(state.catalog.get_book(id).await))
}

pub async fn update(
    state: &AppState,
    headers: &HeaderMap,
    input: Option<Value>,
) -> Result<Response, RpcError> {
    let admin = require_admin(state, headers).await?;
    let UpdateBookInput { id, data } = require_input(input)?;
    let id = positive_id("id", id)?;

    tracing::info!("Admin {} updating book {}", admin.open_id, id);
    let detail = state.catalog.update_book(id, data).await?;
    Ok(reply(detail))
}
