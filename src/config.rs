use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{builder::BoolishValueParser, ArgAction, Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// The `links` table of the Supabase project, over PostgREST.
    Supabase,
    /// A local SQLite file.
    Sqlite,
}

/// Link shortener backed by Supabase
///
/// Every option can also be given through the environment or a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(version, long_about = None)]
pub struct Config {
    /// Public base URL short links are built on
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: String,

    /// Where link records live
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Supabase)]
    pub store_backend: StoreBackend,

    /// SQLite database file, used with `--store-backend sqlite`
    #[arg(long, env = "DATABASE_URL", default_value = "links.db")]
    pub database_url: String,

    /// Serve `GET /:code` redirects without a bearer token
    ///
    /// The environment form accepts `1`/`0`, `yes`/`no`, `on`/`off` and `true`/`false`.
    #[arg(
        long,
        env = "PUBLIC_REDIRECTS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub public_redirects: bool,

    /// Upper bound for handling a single request
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Parsing reads the process environment, which these tests mutate.
    static ENV: Mutex<()> = Mutex::new(());

    fn parse(args: &[&str]) -> Config {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        Config::try_parse_from(args.iter().copied()).unwrap()
    }

    fn parse_with_public_redirects(value: &str) -> Config {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("PUBLIC_REDIRECTS", value);
        let config = Config::try_parse_from(REQUIRED);
        std::env::remove_var("PUBLIC_REDIRECTS");
        config.unwrap()
    }

    const REQUIRED: [&str; 5] = [
        "link-shortener",
        "--supabase-url",
        "https://project.supabase.co",
        "--supabase-key",
        "anon-key",
    ];

    #[test]
    fn defaults_match_the_documented_ones() {
        let config = parse(&REQUIRED);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.port, 3000);
        assert_eq!(config.store_backend, StoreBackend::Supabase);
        assert!(!config.public_redirects);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.listen_addr(), "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--base-url",
            "http://host:3000",
            "--port",
            "8080",
            "--store-backend",
            "sqlite",
            "--public-redirects",
        ]);
        let config = parse(&args);
        assert_eq!(config.base_url, "http://host:3000");
        assert_eq!(config.listen_addr().port(), 8080);
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert!(config.public_redirects);
    }

    #[test]
    fn public_redirects_reads_common_env_spellings() {
        for on in ["1", "true", "yes", "on"] {
            assert!(parse_with_public_redirects(on).public_redirects, "{on}");
        }
        for off in ["0", "false", "no", "off"] {
            assert!(!parse_with_public_redirects(off).public_redirects, "{off}");
        }
    }

    #[test]
    fn validate_clap_definition() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
