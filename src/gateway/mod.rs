//! Per-entity access to the store holding venue configuration.
//!
//! Every operation is a single request/response call. The trait is
//! implemented by the hosted REST backend ([`RestGateway`]), by the local
//! SQLite repositories in [`crate::db`], and wrapped by [`CachedGateway`]
//! to cache list reads until they are invalidated.

mod cache;
mod rest;
#[cfg(test)]
pub(crate) mod recording;

pub use cache::CachedGateway;
pub use rest::RestGateway;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Fields, SyncRecord};

/// Errors surfaced by gateway calls.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Backend not configured. Add remote.url and remote.api_key to config.")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid row in store: {0}")]
    InvalidRow(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// CRUD operations for one record type, scoped by venue on reads.
#[async_trait]
pub trait Gateway<R: SyncRecord>: Send + Sync {
    /// All records belonging to a venue.
    async fn list(&self, bar_id: &str) -> Result<Vec<R>, GatewayError>;

    /// Inserts a record; the store assigns its id.
    async fn create(&self, fields: Fields) -> Result<R, GatewayError>;

    /// Replaces the fields of a persisted record.
    async fn update(&self, id: &str, fields: Fields) -> Result<R, GatewayError>;

    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}
