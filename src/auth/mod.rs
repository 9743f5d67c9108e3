use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    TypedHeader,
};
use headers::{authorization::Bearer, Authorization};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ApiError;

pub mod supabase;

pub use supabase::GoTrueProvider;

#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What signup and login hand back to the client, as the provider sent it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthSession {
    pub user: Value,
    /// `None` when the provider wants the address confirmed first.
    pub session: Option<Value>,
}

/// The user behind a validated bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    async fn validate_token(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Resolves the request's bearer token to a [`Principal`].
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Principal, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ApiError::MissingToken);
    };

    identity.validate_token(bearer.token()).await.map_err(|e| {
        warn!("bearer token rejected: {}", e);
        ApiError::Unauthorized
    })
}

/// Middleware rejecting requests without a bearer token the identity provider
/// accepts. The resolved [`Principal`] is stored in the request extensions.
pub async fn require_bearer<B>(
    State(identity): State<Arc<dyn IdentityProvider>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<Response, ApiError> {
    let principal = authenticate(identity.as_ref(), bearer).await.map_err(|e| {
        debug!("rejecting {}: {}", req.uri().path(), e);
        e
    })?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
