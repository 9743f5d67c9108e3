use link_shortener::models::NewLink;
use link_shortener::shortener::{create_link, ShortenError, MAX_ATTEMPTS};
use link_shortener::slug::{gen_slug, is_valid_slug};
use link_shortener::store::{LinkStore, SqliteStore};
use tempfile::TempDir;

async fn store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.db");
    let store = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
    (dir, store)
}

async fn occupy(store: &SqliteStore, code: &str) {
    store
        .insert(NewLink {
            short_code: code,
            original_url: "https://taken.example",
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn collision_draws_a_new_code() {
    let (_dir, store) = store().await;
    occupy(&store, "dupdupd").await;

    let mut codes = vec!["fresh12", "dupdupd", "dupdupd"];
    let link = create_link(&store, "https://example.com", || codes.pop().unwrap().to_owned())
        .await
        .unwrap();

    assert_eq!(link.short_code, "fresh12");
    assert_eq!(link.original_url, "https://example.com");
    assert_eq!(link.clicks, 0);

    // the occupied record is untouched
    let taken = store.find_by_code("dupdupd").await.unwrap().unwrap();
    assert_eq!(taken.original_url, "https://taken.example");
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let (_dir, store) = store().await;
    occupy(&store, "dupdupd").await;

    let mut calls = 0;
    let err = create_link(&store, "https://example.com", || {
        calls += 1;
        "dupdupd".to_owned()
    })
    .await
    .unwrap_err();

    assert!(matches!(err, ShortenError::CodeSpaceExhausted(n) if n == MAX_ATTEMPTS));
    assert_eq!(calls, MAX_ATTEMPTS);
}

#[tokio::test]
async fn invalid_url_is_rejected_before_storing() {
    let (_dir, store) = store().await;

    let err = create_link(&store, "example.com", || "abc1234".to_owned())
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenError::InvalidUrl(_)));
    assert!(store.find_by_code("abc1234").await.unwrap().is_none());
}

#[tokio::test]
async fn default_generator_produces_distinct_codes() {
    let (_dir, store) = store().await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..50 {
        let link = create_link(&store, "https://example.com", gen_slug)
            .await
            .unwrap();
        assert!(is_valid_slug(&link.short_code));
        assert!(seen.insert(link.short_code));
    }
}

#[tokio::test]
async fn route_names_are_never_handed_out() {
    let (_dir, store) = store().await;

    let mut codes = vec!["fresh12", "shorten"];
    let link = create_link(&store, "https://example.com", || codes.pop().unwrap().to_owned())
        .await
        .unwrap();

    assert_eq!(link.short_code, "fresh12");
    assert!(store.find_by_code("shorten").await.unwrap().is_none());
}
