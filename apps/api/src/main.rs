use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use provider_cell::{InMemoryProviderDirectory, ProviderDirectory, SupabaseProviderDirectory};
use scheduling_cell::store::{InMemorySchedulingStore, SupabaseSchedulingStore};
use scheduling_cell::{SchedulingService, TracingEventSink};
use shared_config::AppConfig;

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

    info!("Starting scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();
    let service = Arc::new(build_service(&config));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(service)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn build_service(config: &AppConfig) -> SchedulingService {
    let events = Arc::new(TracingEventSink);

    if config.is_configured() {
        info!("Using Supabase-backed stores at {}", config.supabase_url);
        let store = Arc::new(SupabaseSchedulingStore::new(config));
        let directory: Arc<dyn ProviderDirectory> = Arc::new(SupabaseProviderDirectory::new(config));
        return SchedulingService::new(config.scheduling.clone(), store.clone(), store, directory, events);
    }

    warn!("SUPABASE_URL / SUPABASE_SERVICE_KEY not set; using in-memory stores");
    let store = Arc::new(InMemorySchedulingStore::new());
    let directory: Arc<dyn ProviderDirectory> = Arc::new(InMemoryProviderDirectory::new());
    SchedulingService::new(config.scheduling.clone(), store.clone(), store, directory, events)
}
