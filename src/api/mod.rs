pub mod admin;
pub mod auth;
pub mod authors;
pub mod books;
pub mod editions;
pub mod error;
pub mod health;
pub mod rpc;
pub mod tags;

use axum::{
    Router,
    routing::{get, post},
};

use crate::infrastructure::AppState;

pub use error::RpcError;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // RPC: queries over GET or POST, mutations over POST only
        .route("/rpc/:procedure", get(rpc::query).post(rpc::call))
        // Spreadsheet import used by the upload script
        .route("/import-books", post(admin::legacy_import))
        .with_state(state)
}
