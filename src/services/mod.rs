//! Services Layer
//!
//! Business logic shared by the RPC handlers and the command line.

pub mod catalog_service;
pub mod user_service;

pub use catalog_service::CatalogService;
pub use user_service::UserService;
