//! Amity Server
//!
//! HTTP front end for Amity Core:
//!
//! 1. **Accounts**: signup and login issue a signed session token in an
//!    `HttpOnly` cookie; profile reads and updates.
//!
//! 2. **Friends**: username search, friend requests (send, accept,
//!    decline), incoming requests, friend lists and friend-of-friend
//!    recommendations.
//!
//! 3. **Media**: image/video uploads with per-user listing, filtered
//!    search, owner-only deletion and public file serving.

mod api;
mod auth;
mod error;
mod state;

use std::path::PathBuf;

use amity_core::{CoreConfig, FriendsConfig};
use clap::Parser;

use state::{AppState, ServerConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "amity-server", version, about = "Amity social backend")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// SQLite database file. In-memory when unset.
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<String>,

    /// Directory for uploaded media. Kept in memory when unset.
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Secret the session signing key is derived from
    #[arg(long, default_value = "amity-dev-secret", env = "SESSION_SECRET")]
    session_secret: String,

    /// Origin allowed to call the API with credentials
    #[arg(long, default_value = "http://localhost:5173", env = "ALLOWED_ORIGIN")]
    allowed_origin: String,

    /// Session lifetime in seconds (at most one year)
    #[arg(
        long,
        default_value_t = 3 * 24 * 3600,
        env = "TOKEN_TTL_SECS",
        value_parser = clap::value_parser!(i64).range(1..=amity_core::auth::MAX_TOKEN_TTL_SECS)
    )]
    token_ttl_secs: i64,

    /// Maximum upload size in MiB
    #[arg(long, default_value_t = 1000, env = "MAX_UPLOAD_MB")]
    max_upload_mb: usize,

    /// Prefix for media URLs handed to clients (e.g. "https://api.example.com")
    #[arg(long, default_value = "", env = "PUBLIC_BASE_URL")]
    public_base_url: String,
}

impl Args {
    fn core_config(&self) -> CoreConfig {
        CoreConfig {
            database_path: self.database_path.clone(),
            data_dir: self.data_dir.clone(),
            session_secret: self.session_secret.clone(),
            token_ttl_secs: self.token_ttl_secs,
            public_base_url: self.public_base_url.clone(),
            friends: FriendsConfig::default(),
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            allowed_origin: self.allowed_origin.clone(),
            max_upload_mb: self.max_upload_mb,
        }
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amity_server=info,amity_core=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    if args.session_secret == "amity-dev-secret" {
        tracing::warn!("SESSION_SECRET not set, using the development secret");
    }
    if args.database_path.is_none() {
        tracing::warn!("DATABASE_PATH not set, accounts will not survive a restart");
    }

    let config = args.server_config();
    let port = config.port;

    let state = AppState::open(args.core_config(), config)
        .await
        .expect("Failed to open Amity core");

    let app = api::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Amity server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_core_config() {
        let args = Args::parse_from(["amity-server", "--session-secret", "s3cret"]);
        let core = args.core_config();
        assert_eq!(core.session_secret, "s3cret");
        assert_eq!(core.friends.max_attempts, FriendsConfig::default().max_attempts);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "amity-server",
            "--port",
            "8081",
            "--database-path",
            "/tmp/amity.db",
            "--allowed-origin",
            "https://app.example.com",
        ]);
        assert_eq!(args.server_config().port, 8081);
        assert_eq!(args.server_config().allowed_origin, "https://app.example.com");
        assert_eq!(args.core_config().database_path.as_deref(), Some("/tmp/amity.db"));
    }

    #[test]
    fn test_token_ttl_bounds() {
        assert!(Args::try_parse_from(["amity-server", "--token-ttl-secs", "0"]).is_err());
        assert!(Args::try_parse_from([
            "amity-server",
            "--token-ttl-secs",
            "9223372036854775807",
        ])
        .is_err());

        let args = Args::try_parse_from(["amity-server", "--token-ttl-secs", "3600"]).unwrap();
        assert_eq!(args.core_config().token_ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_state_opens_with_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..CoreConfig::default()
        };
        let state = AppState::open(core, ServerConfig::default()).await.unwrap();
        assert_eq!(state.config.port, 3000);
    }
}
