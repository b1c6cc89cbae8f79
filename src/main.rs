//! Sitekit CMS Backend
//!
//! Multi-tenant content backend with SQLite persistence and static JSON snapshots.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod site;
mod snapshot;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use site::{Environment, FileStore, HostInfo, LocalStore, MemoryStore, SiteResolver};
use snapshot::{SnapshotGenerator, SnapshotReader, SuccessPolicy};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub resolver: Arc<SiteResolver>,
    pub generator: Arc<SnapshotGenerator>,
    pub reader: Arc<SnapshotReader>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sitekit CMS Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Snapshot directory: {:?}", config.snapshot_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let resolver = Arc::new(SiteResolver::new(repo.clone(), Environment::from_process()));

    let site_cache: Arc<dyn LocalStore> = match &config.site_cache_path {
        Some(path) => {
            let store = FileStore::new(path);
            tracing::info!("Site cache: {:?}", store.path());
            Arc::new(store)
        }
        None => {
            tracing::info!("Site cache: in-memory");
            Arc::new(MemoryStore::new())
        }
    };

    let generator = SnapshotGenerator::new(
        repo.clone(),
        resolver.clone(),
        &config.snapshot_dir,
        SuccessPolicy::new(config.snapshot_min_successes),
    )
    .with_host(config.public_host.as_deref().and_then(HostInfo::parse))
    .with_store(site_cache);
    let generator = Arc::new(generator);

    if config.generate_on_start {
        tracing::info!("Generating static files...");
        match generator.generate_all(None).await {
            Ok(report) if report.success => {
                tracing::info!("Static files ready for site {}", report.site_id)
            }
            Ok(report) => tracing::warn!(
                "Only {} of {} static files generated for site {}",
                report.successful,
                report.results.len(),
                report.site_id
            ),
            Err(e) => tracing::error!("Could not ensure a site for static generation: {}", e),
        }
    }

    let reader = Arc::new(SnapshotReader::new(generator.output_dir()));

    // Create application state
    let state = AppState {
        repo,
        resolver,
        generator,
        reader,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tenant resolution
        .route("/site", get(api::current_site))
        .route("/sites", post(api::create_site))
        .route("/sites/{id}", get(api::get_site))
        // Site content
        .route(
            "/sites/{id}/pages",
            get(api::list_pages).post(api::create_page),
        )
        .route(
            "/sites/{id}/pages/{page_id}",
            delete(api::delete_page),
        )
        .route(
            "/sites/{id}/pages/{page_id}/status",
            put(api::update_page_status),
        )
        .route(
            "/sites/{id}/navigation",
            get(api::list_navigation).post(api::create_navigation_item),
        )
        .route(
            "/sites/{id}/templates",
            get(api::list_templates).post(api::create_template),
        )
        // Visitor pages
        .route("/pages/{slug}", get(api::get_published_page))
        // Snapshots
        .route("/snapshots", post(api::generate_snapshots))
        .route("/snapshots/{collection}", get(api::get_snapshot));

    let static_routes = Router::new().route("/static/pages/{slug}", get(api::get_static_page));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(static_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
