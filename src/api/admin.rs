use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::RpcError;
use crate::import::ImportSummary;
use crate::infrastructure::AppState;

pub const MAX_IMPORT_RECORDS: usize = 10_000;

/// Byte comparison whose running time does not depend on where inputs differ.
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The shared secret is checked before anything else about the input.
fn check_admin_key(state: &AppState, input: Option<&Value>) -> Result<(), RpcError> {
    let provided = input.and_then(|v| v.get("adminKey")).and_then(Value::as_str);
    match provided {
        Some(key) if keys_match(key, &state.config.admin_import_key) => Ok(()),
        _ => {
            tracing::warn!("Import rejected: invalid admin key");
            Err(RpcError::Unauthorized("Invalid admin key".to_string()))
        }
    }
}

pub async fn import_books(
    state: &AppState,
    input: Option<Value>,
) -> Result<ImportSummary, RpcError> {
    check_admin_key(state, input.as_ref())?;

    let books = match input.as_ref().and_then(|v| v.get("books")) {
        Some(Value::Array(books)) => books,
        _ => return Err(RpcError::Validation("books must be an array".to_string())),
    };
    if books.len() > MAX_IMPORT_RECORDS {
        return Err(RpcError::Validation(format!(
            "at most {} books can be imported at once",
            MAX_IMPORT_RECORDS
        )));
    }

    Ok(state.importer.import_records(books).await?)
}

/// `POST /api/import-books` with `{books, adminKey}`; replies with the bare summary.
pub async fn legacy_import(State(state): State<AppState>, body: Bytes) -> Response {
    let input = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => Some(value),
        // An unreadable body carries no key, so it fails the secret check.
        Err(_) => None,
    };

    match import_books(&state, input).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison() {
        assert!(keys_match("salon-knjige-admin-2026", "salon-knjige-admin-2026"));
        assert!(!keys_match("salon-knjige-admin-2025", "salon-knjige-admin-2026"));
        assert!(!keys_match("salon", "salon-knjige-admin-2026"));
        assert!(!keys_match("", "x"));
    }
}
