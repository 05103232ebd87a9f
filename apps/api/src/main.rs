use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::followup::{FollowUpQueue, FollowUpWorker, InMemoryFollowUpQueue};
use appointment_cell::services::reconciliation::StatusSweepWorker;
use appointment_cell::services::store::{
    AppointmentStores, InMemoryStore, RedisFollowUpQueue, RedisSequenceGenerator,
};
use appointment_cell::AppointmentCellState;
use shared_config::AppConfig;

async fn build_stores(config: &AppConfig) -> anyhow::Result<(AppointmentStores, Arc<dyn FollowUpQueue>)> {
    let mut stores = if config.is_database_configured() {
        info!("Using Supabase appointment store at {}", config.supabase_url);
        AppointmentStores::supabase(config)
    } else {
        warn!("Supabase not configured - appointments are kept in process memory");
        AppointmentStores::in_memory(Arc::new(InMemoryStore::new()))
    };

    let queue: Arc<dyn FollowUpQueue> = match &config.redis_url {
        Some(redis_url) => {
            stores = stores.with_sequences(Arc::new(RedisSequenceGenerator::new(redis_url).await?));
            Arc::new(RedisFollowUpQueue::new(redis_url).await?)
        }
        None => {
            warn!("REDIS_URL not set - follow-up queue is not durable");
            Arc::new(InMemoryFollowUpQueue::new())
        }
    };

    Ok((stores, queue))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Salon API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    info!("Business timezone: {}", config.business_tz());

    let (stores, queue) = build_stores(&config).await?;
    let state = Arc::new(AppointmentCellState::new(config.clone(), stores, queue));

    // Background workers
    let sweep_worker = Arc::new(StatusSweepWorker::new(
        state.sweep.clone(),
        config.status_sweep_interval_seconds,
    ));
    let followup_worker = Arc::new(FollowUpWorker::new(
        state.followups.clone(),
        config.followup_interval_seconds,
    ));
    tokio::spawn(sweep_worker.clone().run());
    tokio::spawn(followup_worker.clone().run());

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    sweep_worker.shutdown().await;
    followup_worker.shutdown().await;
    info!("Server stopped");

    Ok(())
}
