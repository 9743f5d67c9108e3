pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod redirector;
pub mod routes;
pub mod schema;
pub mod shortener;
pub mod slug;
pub mod store;
pub mod supabase;

pub use routes::{router, AccessPolicy, AppState};
