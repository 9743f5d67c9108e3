use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::models::{Link, NewLink};
use crate::slug::is_reserved_slug;
use crate::store::{LinkStore, StoreError};

/// How many fresh codes to try before giving up on a collision streak.
pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("unable to find a free short code after {0} attempts")]
    CodeSpaceExhausted(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts absolute `http`/`https` URLs with a host.
///
/// The raw text must be printable ASCII since it is later sent back verbatim
/// in a `Location` header.
pub fn validate_url(raw: &str) -> Result<(), ShortenError> {
    if !raw.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(ShortenError::InvalidUrl(
            "only printable ASCII is allowed, percent-encode the rest".to_owned(),
        ));
    }
    let parsed = Url::parse(raw).map_err(|e| ShortenError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ShortenError::InvalidUrl(format!("unsupported scheme `{}`", other))),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ShortenError::InvalidUrl("missing host".to_owned()));
    }
    Ok(())
}

/// Stores `original_url` under a freshly generated code.
///
/// The store's uniqueness constraint is the collision check: on
/// [`StoreError::Conflict`] a new code is drawn, up to [`MAX_ATTEMPTS`] times.
/// Codes that collide with a route name count as taken.
/// The URL itself is stored exactly as given.
pub async fn create_link<G>(
    store: &dyn LinkStore,
    original_url: &str,
    mut gen_slug: G,
) -> Result<Link, ShortenError>
where
    G: FnMut() -> String + Send,
{
    validate_url(original_url)?;

    for attempt in 1..=MAX_ATTEMPTS {
        let slug = gen_slug();
        if is_reserved_slug(&slug) {
            warn!("short code {} is a reserved route, retrying", slug);
            continue;
        }
        let new = NewLink {
            short_code: &slug,
            original_url,
        };
        match store.insert(new).await {
            Ok(link) => {
                debug!("stored {} after {} attempt(s)", link.short_code, attempt);
                return Ok(link);
            }
            Err(StoreError::Conflict) => {
                warn!("short code {} already taken, retrying", slug);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ShortenError::CodeSpaceExhausted(MAX_ATTEMPTS))
}
