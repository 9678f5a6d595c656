//! Domain layer - Pure business abstractions
//!
//! Trait definitions for data access plus the catalog value types they exchange.

pub mod errors;
pub mod repositories;

pub use errors::DomainError;
pub use repositories::*;
