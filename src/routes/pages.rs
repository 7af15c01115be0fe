use crate::{AppState, handlers::pages};
use axum::{Router, routing::get};

/// Page Router Module
///
/// The guarded page paths. Anonymous and wrong-role callers never reach
/// these handlers: the access policy redirects them first.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(pages::admin_page))
        .route("/profile", get(pages::profile_page))
        .route("/favorites", get(pages::favorites_page))
        .route("/sell", get(pages::sell_page))
        .route("/sell/edit/{id}", get(pages::edit_listing_page))
        .route("/dashboard/seller", get(pages::seller_dashboard_page))
        .route("/dashboard/buyer", get(pages::buyer_dashboard_page))
}
