//! Biblioperson Backend
//!
//! Personal digital library: document uploads, paginated reading, annotations and
//! bookmarks, full-text search and author persona chat over SQLite and Tantivy.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod ingest;
mod models;
mod persona;
mod search;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use ingest::Processor;
use search::SearchIndex;

/// Room for the multipart framing and text fields around the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub processor: Arc<Processor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, search: Arc<SearchIndex>, config: Config) -> Self {
        let processor = Arc::new(Processor::new(repo.clone(), search.clone(), &config));
        Self {
            repo,
            search,
            processor,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Biblioperson backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (BIBLIO_API_PSK). Authentication is disabled!");
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let segments = repo.list_indexable_segments(None).await?;
    search.rebuild(&segments).await?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, search, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

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

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    let upload_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let upload_limit = usize::try_from(upload_limit).unwrap_or(usize::MAX);

    // API routes
    let api_routes = Router::new()
        // Upload
        .route(
            "/upload",
            post(api::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Documents
        .route(
            "/documents",
            get(api::list_documents).post(api::create_document),
        )
        .route(
            "/documents/{id}",
            get(api::get_document)
                .put(api::update_document)
                .delete(api::delete_document),
        )
        .route("/documents/{id}/process", post(api::process_document))
        // Reader
        .route(
            "/ebook/{id}",
            get(api::get_ebook_page).put(api::update_reading_progress),
        )
        .route("/ebook/{id}/progress", get(api::get_reading_progress))
        // Annotations
        .route(
            "/annotations",
            get(api::list_annotations).post(api::create_annotation),
        )
        .route(
            "/annotations/{id}",
            get(api::get_annotation)
                .put(api::update_annotation)
                .delete(api::delete_annotation),
        )
        // Bookmarks
        .route(
            "/bookmarks",
            get(api::list_bookmarks).post(api::create_bookmark),
        )
        .route(
            "/bookmarks/{id}",
            put(api::update_bookmark).delete(api::delete_bookmark),
        )
        // Library
        .route("/library", get(api::get_library))
        .route("/authors", get(api::list_authors))
        .route("/authors/{id}", get(api::get_author))
        // Search and persona
        .route("/search", get(api::search_pages))
        .route("/chat", post(api::chat_with_author))
        // Users
        .route("/user/sync", post(api::sync_user))
        .route(
            "/admin/delete-user",
            post(api::delete_user).delete(api::delete_user),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
