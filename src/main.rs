use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use link_shortener::{
    auth::GoTrueProvider,
    config::{Config, StoreBackend},
    router,
    store::{LinkStore, SqliteStore, SupabaseStore},
    supabase::SupabaseClient,
    AccessPolicy, AppState,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "link_shortener=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // one client for both the store and the identity provider
    let supabase = SupabaseClient::new(
        &config.supabase_url,
        &config.supabase_key,
        config.request_timeout(),
    );

    let links: Arc<dyn LinkStore> = match config.store_backend {
        StoreBackend::Supabase => Arc::new(SupabaseStore::new(supabase.clone())),
        StoreBackend::Sqlite => Arc::new(
            SqliteStore::open(&config.database_url)
                .await
                .with_context(|| format!("opening sqlite store at {}", config.database_url))?,
        ),
    };
    let identity = Arc::new(GoTrueProvider::new(supabase));

    info!(
        store = links.name(),
        base_url = %config.base_url,
        public_redirects = config.public_redirects,
        "configured"
    );

    let state = AppState::new(links, identity, &config.base_url);
    let policy = AccessPolicy {
        public_redirects: config.public_redirects,
    };
    let app = router(state, policy, config.request_timeout());

    let addr = config.listen_addr();
    info!("server listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    Ok(())
}
