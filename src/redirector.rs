use tracing::debug;

use crate::models::Link;
use crate::slug::is_valid_slug;
use crate::store::{LinkStore, StoreError};

/// Counts a visit to `code` and returns the record to redirect to.
///
/// Lookup and increment are one store operation, so a redirect is never
/// handed out without its click being recorded. A store failure fails the
/// whole resolve. Codes the generator could not have produced are reported as
/// missing without a store round trip.
pub async fn resolve(store: &dyn LinkStore, code: &str) -> Result<Option<Link>, StoreError> {
    if !is_valid_slug(code) {
        debug!("ignoring malformed short code {:?}", code);
        return Ok(None);
    }
    store.increment_clicks(code).await
}

/// Current click count of `code`; read-only.
pub async fn click_count(store: &dyn LinkStore, code: &str) -> Result<Option<i64>, StoreError> {
    if !is_valid_slug(code) {
        return Ok(None);
    }
    Ok(store.find_by_code(code).await?.map(|link| link.clicks))
}
