use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{LinkStore, StoreError};
use crate::models::{Link, NewLink};
use crate::supabase::{ApiRequest, ApiResponse, SupabaseClient};

const LINKS_PATH: &str = "/rest/v1/links";
const INCREMENT_PATH: &str = "/rest/v1/rpc/increment_link_clicks";
const LINK_COLUMNS: &str = "id,short_code,original_url,clicks";
const UNIQUE_VIOLATION: &str = "23505";

/// Link store on the `links` table of a Supabase project, via PostgREST.
///
/// Click increments go through the `increment_link_clicks` SQL function
/// (see `supabase/schema.sql`), so they are a single atomic UPDATE.
#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, StoreError> {
        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }
        if response.status == 409 || response.code() == Some(UNIQUE_VIOLATION) {
            return Err(StoreError::Conflict);
        }
        error!(
            "PostgREST error {}: {}",
            response.status,
            response.error_message()
        );
        Err(StoreError::Backend(response.error_message()))
    }
}

/// PostgREST answers row queries with a JSON array; we only ever want the
/// first row.
fn first_row(body: Value) -> Result<Option<Link>, StoreError> {
    let rows: Vec<Link> = serde_json::from_value(body)
        .map_err(|e| StoreError::Backend(format!("unexpected row shape: {}", e)))?;
    Ok(rows.into_iter().next())
}

#[async_trait]
impl LinkStore for SupabaseStore {
    async fn insert(&self, link: NewLink<'_>) -> Result<Link, StoreError> {
        debug!("inserting link {}", link.short_code);
        let body = serde_json::to_value(&link)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let response = self
            .call(
                ApiRequest::post(LINKS_PATH, json!([body]))
                    .query("select", LINK_COLUMNS)
                    .prefer("return=representation"),
            )
            .await?;

        first_row(response.body)?
            .ok_or_else(|| StoreError::Backend("insert returned no row".to_owned()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, StoreError> {
        let response = self
            .call(
                ApiRequest::get(LINKS_PATH)
                    .query("select", LINK_COLUMNS)
                    .query("short_code", format!("eq.{}", code))
                    .query("limit", "1"),
            )
            .await?;
        first_row(response.body)
    }

    async fn increment_clicks(&self, code: &str) -> Result<Option<Link>, StoreError> {
        let response = self
            .call(ApiRequest::post(INCREMENT_PATH, json!({ "code": code })))
            .await?;
        first_row(response.body)
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
