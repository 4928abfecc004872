//! Quillpad backend server binary.
//!
//! Loads settings once, resolves the runtime mode, wires the matching
//! authentication provider, and serves the HTTP API. Prints `{"port": N}`
//! to stdout so a parent process can discover the bound port.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use quillpad_api::config::ApiConfig;
use quillpad_core::auth::jwt::JwtTokenManager;
use quillpad_core::auth::provider::{AuthProvider, LocalAuth};
use quillpad_core::auth::queries::PgUserRepository;
use quillpad_core::auth::service::AuthService;
use quillpad_core::runtime::RuntimeFlags;
use quillpad_core::settings::Settings;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "quillpad_server", about = "Quillpad backend server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// PostgreSQL connection URL (online mode only).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/quillpad"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Per-request deadline for auth operations, in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Explicit, once-only configuration load; everything below reads `settings`.
    let settings = Settings::from_env();

    // Write logs to stderr so stdout is reserved for the JSON port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,quillpad_api=debug,quillpad_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let flags = RuntimeFlags::resolve(&settings);
    let token_config = settings.token_config();
    let jwt = match JwtTokenManager::new(&token_config, &flags) {
        Ok(jwt) => Arc::new(jwt),
        Err(e) => {
            error!(mode = %flags.mode, error = %e, "cannot start without a signing secret");
            return Err(e.into());
        }
    };
    info!(
        access_ttl_secs = token_config.access_ttl.as_secs(),
        refresh_ttl_secs = token_config.refresh_ttl.as_secs(),
        "token manager ready"
    );

    let provider = match &flags.local {
        Some(local) => {
            std::fs::create_dir_all(&local.storage_path)?;
            info!(storage_path = %local.storage_path.display(), "local storage ready");
            AuthProvider::Local(LocalAuth::new(local, jwt.clone(), jwt))
        }
        None => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&args.database_url)
                .await?;

            info!("running database migrations");
            quillpad_core::migrate::migrate(&pool).await?;

            AuthProvider::Online(AuthService::new(
                Arc::new(PgUserRepository::new(pool)),
                jwt.clone(),
                jwt,
            ))
        }
    };

    let config = ApiConfig {
        bind_addr: format!("127.0.0.1:{}", args.port),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let app = quillpad_api::router(quillpad_api::AppState { provider, config });

    // Report the bound port as JSON on stdout for the parent process.
    println!("{}", serde_json::json!({"port": local_addr.port()}));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    info!(addr = %local_addr, mode = %flags.mode, "REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
