use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any client may call. `GET /api/cars` shares its path with the
/// authenticated `POST`; the access policy only gates the mutating methods.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // --- Accounts ---
        .route("/api/register", post(handlers::accounts::register))
        .route("/api/auth/login", post(handlers::accounts::login))
        .route("/api/auth/logout", post(handlers::accounts::logout))
        // --- Catalog ---
        // GET /api/cars?brand=&minPrice=&maxPrice=&minYear=&maxYear=
        .route("/api/cars", get(handlers::cars::list_cars))
        .route("/api/cars/{id}", get(handlers::cars::get_car))
        // --- Filter sources ---
        .route("/api/filters/options", get(handlers::filters::filter_options))
        .route("/api/filters/models", get(handlers::filters::filter_models))
        .route("/api/filters/versions", get(handlers::filters::filter_versions))
        // POST /api/contact
        // Contact form; stores the message and mails a confirmation.
        .route("/api/contact", post(handlers::contact::submit_contact))
}
