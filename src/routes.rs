use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderValue,
    middleware,
    response::Redirect,
    routing::{get, post},
    BoxError, Extension, Json, Router, TypedHeader,
};
use headers::{authorization::Bearer, Authorization};
use axum_client_ip::InsecureClientIp;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    authenticate, require_bearer, AuthSession, Credentials, IdentityProvider, Principal,
};
use crate::error::ApiError;
use crate::slug::{gen_slug, short_url};
use crate::store::LinkStore;
use crate::shortener::ShortenError;
use crate::{redirector, shortener};

/// Shared handles every handler gets through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<dyn LinkStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        links: Arc<dyn LinkStore>,
        identity: Arc<dyn IdentityProvider>,
        base_url: &str,
    ) -> Self {
        Self {
            links,
            identity,
            base_url: base_url.into(),
        }
    }
}

/// Which routes sit behind the bearer-token gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    /// Let anyone follow `GET /:code` redirects.
    pub public_redirects: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortenReq {
    original_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShortenRes {
    short_url: String,
}

#[derive(Debug, Serialize)]
struct ClicksRes {
    clicks: i64,
}

#[instrument(name = "HTTP: signup", skip_all)]
async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(credentials) = payload?;
    let session = state.identity.sign_up(&credentials).await.map_err(|e| {
        warn!("signup failed: {}", e);
        e
    })?;
    Ok(Json(session))
}

#[instrument(name = "HTTP: login", skip_all)]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let Json(credentials) = payload?;
    let session = state.identity.sign_in(&credentials).await.map_err(|e| {
        warn!("login failed: {}", e);
        e
    })?;
    Ok(Json(session))
}

#[instrument(name = "HTTP: shorten", skip_all)]
async fn shorten(
    State(state): State<AppState>,
    client_ip: Option<InsecureClientIp>,
    principal: Option<Extension<Principal>>,
    payload: Result<Json<ShortenReq>, JsonRejection>,
) -> Result<Json<ShortenRes>, ApiError> {
    let Json(req) = payload?;

    let link = shortener::create_link(state.links.as_ref(), &req.original_url, gen_slug)
        .await
        .map_err(|e| {
            match &e {
                ShortenError::InvalidUrl(_) => warn!("rejected {:?}: {}", req.original_url, e),
                _ => error!("failed to save link for {}: {}", req.original_url, e),
            }
            e
        })?;

    info!(
        short_code = %link.short_code,
        user = ?principal.map(|Extension(p)| p.id),
        client_ip = ?client_ip.map(|InsecureClientIp(ip)| ip),
        "created short link"
    );
    Ok(Json(ShortenRes {
        short_url: short_url(&state.base_url, &link.short_code),
    }))
}

#[instrument(name = "HTTP: redirect", skip(state))]
async fn redirect(
    State(state): State<AppState>,
    Path(short_url): Path<String>,
) -> Result<Redirect, ApiError> {
    match redirector::resolve(state.links.as_ref(), &short_url).await {
        Ok(Some(link)) if HeaderValue::from_str(&link.original_url).is_ok() => {
            info!(clicks = link.clicks, "redirecting to {}", link.original_url);
            Ok(Redirect::to(&link.original_url))
        }
        Ok(Some(link)) => {
            error!("stored url {:?} is not a valid Location header", link.original_url);
            Err(ApiError::Internal)
        }
        Ok(None) => {
            warn!("short link not found");
            Err(ApiError::NotFound)
        }
        Err(e) => {
            error!("failed to update clicks: {}", e);
            Err(ApiError::Database)
        }
    }
}

#[instrument(name = "HTTP: clicks", skip(state))]
async fn clicks(
    State(state): State<AppState>,
    Path(short_url): Path<String>,
) -> Result<Json<ClicksRes>, ApiError> {
    match redirector::click_count(state.links.as_ref(), &short_url).await {
        Ok(Some(clicks)) => Ok(Json(ClicksRes { clicks })),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => {
            error!("failed to read clicks: {}", e);
            Err(ApiError::Database)
        }
    }
}

/// Unmatched paths: 401 without a valid token, 404 otherwise.
async fn fallback(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> ApiError {
    match authenticate(state.identity.as_ref(), bearer).await {
        Ok(_) => ApiError::NotFound,
        Err(e) => e,
    }
}

async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("request timed out");
        ApiError::Timeout
    } else {
        error!("unhandled middleware error: {}", err);
        ApiError::Internal
    }
}

pub fn router(state: AppState, policy: AccessPolicy, request_timeout: Duration) -> Router {
    let open = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login));

    let protected = Router::new()
        .route("/shorten", post(shorten))
        .route("/clicks/:short_url", get(clicks))
        .route_layer(middleware::from_fn_with_state(
            state.identity.clone(),
            require_bearer,
        ));

    let mut redirects = Router::new().route("/:short_url", get(redirect));
    if !policy.public_redirects {
        redirects = redirects.route_layer(middleware::from_fn_with_state(
            state.identity.clone(),
            require_bearer,
        ));
    }

    Router::new()
        .merge(open)
        .merge(protected)
        .merge(redirects)
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(request_timeout),
        )
        .with_state(state)
}
