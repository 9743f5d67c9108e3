//! Thin blocking HTTP client for a Supabase project.
//!
//! Both the PostgREST store and the GoTrue identity provider go through one
//! [`SupabaseClient`], built once at startup and cloned into each backend.
//! ureq is synchronous, so every call is moved onto tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{trace, warn};
use ureq::Agent;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// A single call against the project API, relative to the project URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    bearer: Option<String>,
    prefer: Option<&'static str>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            bearer: None,
            prefer: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sends `Authorization: Bearer <token>` instead of the project key.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// PostgREST `Prefer` header, e.g. `return=representation`.
    pub fn prefer(mut self, prefer: &'static str) -> Self {
        self.prefer = Some(prefer);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// PostgREST error code (a Postgres SQLSTATE such as `23505`).
    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }

    /// Best-effort human readable error from either PostgREST or GoTrue.
    pub fn error_message(&self) -> String {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| self.body.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("upstream responded with status {}", self.status))
    }
}

struct Inner {
    agent: Agent,
    project_url: String,
    api_key: String,
}

#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<Inner>,
}

impl SupabaseClient {
    pub fn new(project_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            inner: Arc::new(Inner {
                agent,
                project_url: project_url.trim_end_matches('/').to_owned(),
                api_key: api_key.to_owned(),
            }),
        }
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SupabaseError> {
        let inner = self.inner.clone();
        let path = request.path.clone();

        tokio::task::spawn_blocking(move || inner.send_sync(request))
            .await
            .unwrap_or_else(|e| {
                warn!("supabase spawn_blocking failed: {}", e);
                Err(e.to_string())
            })
            .map_err(|message| SupabaseError::Transport { path, message })
    }
}

impl Inner {
    fn send_sync(&self, request: ApiRequest) -> Result<ApiResponse, String> {
        let url = format!("{}{}", self.project_url, request.path);
        let token = request.bearer.as_deref().unwrap_or(&self.api_key);
        let authorization = format!("Bearer {}", token);
        trace!("supabase {:?} {}", request.method, url);

        let result = match request.method {
            Method::Get => {
                let mut builder = self
                    .agent
                    .get(&url)
                    .header("apikey", self.api_key.as_str())
                    .header("Authorization", authorization.as_str());
                for (key, value) in &request.query {
                    builder = builder.query(key, value);
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = self
                    .agent
                    .post(&url)
                    .header("apikey", self.api_key.as_str())
                    .header("Authorization", authorization.as_str());
                for (key, value) in &request.query {
                    builder = builder.query(key, value);
                }
                if let Some(prefer) = request.prefer {
                    builder = builder.header("Prefer", prefer);
                }
                builder.send_json(request.body.unwrap_or(Value::Null))
            }
        };

        let response = result.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| e.to_string())?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, body })
    }
}
