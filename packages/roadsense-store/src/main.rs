use clap::Parser;
use roadsense_store::{
    cli::{Cli, Commands},
    create_router, MemoryDataStore, PostgresDataStore, ProcessedDataStore, StorageBackend,
    StoreConfig, StoreState, SubscriberRegistry,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadsense_store=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::from_env()?;

    let store: Arc<dyn ProcessedDataStore> = match config.backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;

            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.max_db_connections)
                .connect(database_url)
                .await?;

            let pg_store = PostgresDataStore::new(pool);
            pg_store.initialize().await?;
            info!("✅ Database schema initialized");

            if let Some(Commands::List { limit }) = cli.command {
                print_recent(&pg_store, limit).await?;
                return Ok(());
            }

            Arc::new(pg_store)
        }
        StorageBackend::Memory => {
            if matches!(cli.command, Some(Commands::List { .. })) {
                return Err("the list command needs the postgres backend".into());
            }
            info!("Using in-memory storage, data will not survive a restart");
            Arc::new(MemoryDataStore::new())
        }
    };

    info!("🚀 Starting RoadSense Store v{}", VERSION);

    let registry = SubscriberRegistry::with_capacity(config.subscriber_buffer);
    let state = Arc::new(StoreState::new(store, registry.clone()));

    // Spawn background task to cleanup idle subscribers
    {
        let heartbeat_timeout = config.heartbeat_timeout_seconds;
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let removed = registry.cleanup_stale(heartbeat_timeout);
                if removed > 0 {
                    info!("Cleaned up {} idle subscribers", removed);
                }
            }
        });
    }

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("🎧 Listening on http://{}", addr);
    info!("📡 WebSocket endpoint: ws://{}/ws/", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Store stopped");
    Ok(())
}

async fn print_recent(
    store: &PostgresDataStore,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = store.recent(limit).await?;

    println!(
        "{:<8} {:<12} {:>10} {:>10} {:>10} {:>11} {:>11} {:<20}",
        "Id", "Road state", "X", "Y", "Z", "Latitude", "Longitude", "Timestamp"
    );
    println!("{}", "-".repeat(100));

    for record in records {
        println!(
            "{:<8} {:<12} {:>10.2} {:>10.2} {:>10.2} {:>11.6} {:>11.6} {:<20}",
            record.id,
            record.road_state,
            record.x,
            record.y,
            record.z,
            record.latitude,
            record.longitude,
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
