use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Moderation endpoints, nested under `/api/admin`. The route layer
/// authenticates the caller; the ADMIN role is checked in each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/admin/users/{id}/ban  {"banned": bool}
        .route("/users/{id}/ban", post(handlers::admin::set_user_banned))
}
