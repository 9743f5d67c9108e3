use nanoid::nanoid;

/// Length of every generated short code.
pub const SLUG_LEN: usize = 7;

/// Top-level route names a short code must not shadow.
pub const RESERVED_SLUGS: &[&str] = &["shorten", "signup", "login", "clicks"];

pub fn gen_slug() -> String {
    nanoid!(SLUG_LEN)
}

/// Whether `slug` could have come out of [`gen_slug`].
///
/// Used to turn obviously bogus paths into a 404 without touching the store.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() == SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Joins the public base URL and a code, e.g. `http://host:3000` + `abc1234`.
pub fn short_url(base_url: &str, slug: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), slug)
}
