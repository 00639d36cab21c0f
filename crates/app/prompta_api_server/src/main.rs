//! Prompta API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use prompta_api::config::ApiConfig;
use prompta_core::auth::memory::MemoryAuthStore;
use prompta_core::auth::queries::PgAuthStore;
use prompta_core::auth::store::AuthStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server. Unset options fall back to the
/// environment (see `ApiConfig::from_env`).
#[derive(Parser, Debug)]
#[command(name = "prompta_api_server", about = "Prompta API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep users and sessions in process memory instead of PostgreSQL.
    /// Everything is lost on exit.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(
                    "info,prompta_api=debug,prompta_core=debug,tower_http=info",
                ))?,
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }
    if !config.cookie_secure {
        warn!("auth cookies are not marked Secure; set PROMPTA_ENV=production behind TLS");
    }

    let store: Arc<dyn AuthStore> = if args.in_memory {
        info!("using in-memory store");
        Arc::new(MemoryAuthStore::new())
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.pg_connection_url)
            .await?;

        info!("running database migrations");
        prompta_api::migrate(&pool).await?;
        Arc::new(PgAuthStore::new(pool))
    };

    let state = prompta_api::AppState {
        store,
        config: config.clone(),
    };
    let app = prompta_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;

    Ok(())
}
