use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Link, NewLink};

pub mod sqlite;
pub mod supabase;

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The short code is already taken.
    #[error("short code already exists")]
    Conflict,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for link records.
///
/// Implementations must enforce uniqueness of `short_code` and report a
/// duplicate insert as [`StoreError::Conflict`].
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn insert(&self, link: NewLink<'_>) -> Result<Link, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, StoreError>;

    /// Adds one click to the record and returns it, in a single atomic step.
    /// `Ok(None)` when no record has this code.
    async fn increment_clicks(&self, code: &str) -> Result<Option<Link>, StoreError>;

    fn name(&self) -> &'static str;
}
