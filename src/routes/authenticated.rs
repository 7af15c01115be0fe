use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// JSON API routes for signed-in users. Wrapped in a route layer that
/// extracts `AuthUser`, so every handler here receives a resolved caller.
/// Ownership and role checks happen inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Listings ---
        .route("/api/cars", post(handlers::cars::create_car))
        // PUT/DELETE /api/cars/{id}
        // Owner or ADMIN only; enforced in the handler.
        .route(
            "/api/cars/{id}",
            put(handlers::cars::update_car).delete(handlers::cars::delete_car),
        )
        // --- Favorites ---
        // POST is idempotent: a repeated bookmark returns the existing row.
        .route(
            "/api/favorites",
            post(handlers::favorites::add_favorite).delete(handlers::favorites::remove_favorite),
        )
        // --- Dashboards ---
        .route("/api/dashboard/buyer", get(handlers::dashboard::buyer_dashboard))
        .route("/api/dashboard/seller", get(handlers::dashboard::seller_dashboard))
        // POST /api/upload
        // JSON-only image upload through the media host.
        .route("/api/upload", post(handlers::media::upload_image))
}
