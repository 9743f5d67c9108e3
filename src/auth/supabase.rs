use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use super::{AuthError, AuthSession, Credentials, IdentityProvider, Principal};
use crate::supabase::{ApiRequest, ApiResponse, SupabaseClient};

const SIGNUP_PATH: &str = "/auth/v1/signup";
const TOKEN_PATH: &str = "/auth/v1/token";
const USER_PATH: &str = "/auth/v1/user";

/// Supabase GoTrue as identity provider.
#[derive(Clone)]
pub struct GoTrueProvider {
    client: SupabaseClient,
}

impl GoTrueProvider {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(AuthError::Rejected(response.error_message()))
        }
    }
}

/// GoTrue returns a full session (`access_token`, `user`, ...) when it can log
/// the user in straight away, and a bare user object otherwise.
fn session_from_body(body: Value) -> AuthSession {
    if body.get("access_token").is_some() {
        AuthSession {
            user: body.get("user").cloned().unwrap_or(Value::Null),
            session: Some(body),
        }
    } else {
        AuthSession {
            user: body,
            session: None,
        }
    }
}

fn principal_from_user(user: &Value) -> Result<Principal, AuthError> {
    let id = user
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::Rejected("user has no id".to_owned()))?;
    Ok(Principal {
        id: id.to_owned(),
        email: user.get("email").and_then(Value::as_str).map(str::to_owned),
    })
}

fn credentials_body(credentials: &Credentials) -> Result<Value, AuthError> {
    serde_json::to_value(credentials).map_err(|e| AuthError::Transport(e.to_string()))
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    #[instrument(name = "GoTrue: sign up", skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let response = self
            .call(ApiRequest::post(SIGNUP_PATH, credentials_body(credentials)?))
            .await?;
        info!("user signed up");
        Ok(session_from_body(response.body))
    }

    #[instrument(name = "GoTrue: sign in", skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        let response = self
            .call(
                ApiRequest::post(TOKEN_PATH, credentials_body(credentials)?)
                    .query("grant_type", "password"),
            )
            .await?;
        info!("user signed in");
        Ok(session_from_body(response.body))
    }

    async fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let response = self.call(ApiRequest::get(USER_PATH).bearer(token)).await?;
        principal_from_user(&response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_body_splits_user_out() {
        let body = json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "user": { "id": "u1", "email": "a@b.c" }
        });
        let session = session_from_body(body.clone());
        assert_eq!(session.user, json!({ "id": "u1", "email": "a@b.c" }));
        assert_eq!(session.session, Some(body));
    }

    #[test]
    fn unconfirmed_signup_has_no_session() {
        let body = json!({ "id": "u1", "email": "a@b.c", "confirmation_sent_at": "now" });
        let session = session_from_body(body.clone());
        assert_eq!(session.user, body);
        assert_eq!(session.session, None);
    }

    #[test]
    fn principal_needs_an_id() {
        let principal = principal_from_user(&json!({ "id": "u1", "email": "a@b.c" })).unwrap();
        assert_eq!(principal.id, "u1");
        assert_eq!(principal.email.as_deref(), Some("a@b.c"));

        assert!(principal_from_user(&json!({ "email": "a@b.c" })).is_err());
    }
}
