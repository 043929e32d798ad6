//! Quickbird API server binary.

use std::net::SocketAddr;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "quickbird_server", about = "Quickbird API server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/quickbird"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,quickbird_api=debug,quickbird_core=debug".parse().unwrap()
            }),
        )
        .init();

    let args = Args::parse();

    info!(database_url = %args.database_url, bind = %args.bind, "starting quickbird_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    quickbird_api::migrate(&pool).await?;

    let mut config = quickbird_api::config::ApiConfig::from_env();
    config.bind_addr = args.bind;
    config.database_url = args.database_url;

    let state = quickbird_api::AppState::new(pool.clone(), config.clone());
    let app = quickbird_api::router(state);

    // The usage-reset scheduler runs for the life of the process and is
    // cancelled cooperatively on shutdown.
    let scheduler_ct = CancellationToken::new();
    let scheduler_handle = tokio::spawn(quickbird_core::scheduler::run(
        pool,
        scheduler_ct.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    // ConnectInfo gives the rate limiter its peer-address fallback.
    let shutdown_ct = scheduler_ct.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        shutdown_ct.cancel();
    })
    .await?;

    scheduler_ct.cancel();
    let _ = scheduler_handle.await;

    Ok(())
}
