//! Reading Circle Backend
//!
//! REST backend for a book club: shared reading list, meet lifecycle with
//! point voting, date polling, and Top 5 rankings. SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod service;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reading Circle Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CIRCLE_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
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

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Meta
        .route("/revision", get(api::get_revision))
        .route("/config", get(api::get_config))
        // Members
        .route("/members", get(api::list_members))
        .route("/members", post(api::create_member))
        .route("/members/{id}", get(api::get_member))
        .route("/members/{id}", delete(api::delete_member))
        // Books
        .route("/books", get(api::list_books))
        .route("/books", post(api::create_book))
        .route("/books/import", post(api::import_books))
        .route("/books/{id}", get(api::get_book))
        .route("/books/{id}", put(api::update_book))
        .route("/books/{id}", delete(api::delete_book))
        // Meets
        .route("/meets", get(api::list_meets))
        .route("/meets", post(api::create_meet))
        .route("/meets/{id}", get(api::get_meet))
        .route("/meets/{id}", put(api::update_meet))
        .route("/meets/{id}", delete(api::delete_meet))
        .route("/meets/{id}/phase", post(api::change_phase))
        // Candidates and book selection
        .route("/meets/{id}/candidates", post(api::add_candidate))
        .route(
            "/meets/{id}/candidates/{candidateId}",
            delete(api::remove_candidate),
        )
        .route("/meets/{id}/select-book", post(api::select_book))
        .route("/meets/{id}/resolve-tie", post(api::resolve_tie))
        // Point voting
        .route("/meets/{id}/votes", put(api::submit_votes))
        .route("/meets/{id}/reveal", post(api::reveal_scores))
        .route("/meets/{id}/vote-status", get(api::vote_status))
        // Date polling
        .route("/meets/{id}/date-options", post(api::add_date_option))
        .route(
            "/meets/{id}/date-options/{optionId}",
            delete(api::remove_date_option),
        )
        .route("/meets/{id}/availability", put(api::submit_availability))
        .route("/meets/{id}/select-date", post(api::select_date))
        // Top 5 rankings
        .route("/meets/{id}/top5", get(api::list_top5))
        .route("/meets/{id}/top5", put(api::submit_top5))
        .route("/rankings", get(api::aggregate_ranking))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
