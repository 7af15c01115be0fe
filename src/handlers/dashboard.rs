use axum::{Json, extract::State};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{BuyerDashboard, Car, Role, SellerDashboard, SellerStats},
    repository::RepositoryState,
};

/// How many listings the buyer dashboard recommends.
pub const RECOMMENDATION_LIMIT: i64 = 6;

/// Placeholder views-per-listing until real view tracking exists.
const VIEWS_PER_LISTING: i64 = 137;

/// seller_stats
///
/// Listing count, rounded mean price and the estimated view count.
pub fn seller_stats(cars: &[Car]) -> SellerStats {
    let total = cars.len() as i64;
    let average_price = if total == 0 {
        0
    } else {
        let sum: i128 = cars.iter().map(|c| i128::from(c.price)).sum();
        // Float-to-int casts saturate.
        (sum as f64 / total as f64).round() as i64
    };
    SellerStats {
        total_listings: total,
        average_price,
        views: total * VIEWS_PER_LISTING,
    }
}

/// Favorites (newest first) plus the newest listings the buyer has not
/// favorited yet.
pub async fn buyer_view(repo: &RepositoryState, user_id: Uuid) -> Result<BuyerDashboard, ApiError> {
    let favorites = repo.list_favorites(user_id).await?;
    let favorited: Vec<Uuid> = favorites.iter().map(|f| f.car_id).collect();
    let recommendations = repo
        .recent_cars_excluding(&favorited, RECOMMENDATION_LIMIT)
        .await?;
    Ok(BuyerDashboard {
        favorites,
        recommendations,
    })
}

pub async fn seller_view(repo: &RepositoryState, user_id: Uuid) -> Result<SellerDashboard, ApiError> {
    let cars = repo.cars_by_owner(user_id).await?;
    let stats = seller_stats(&cars);
    Ok(SellerDashboard { cars, stats })
}

/// buyer_dashboard
///
/// [Authenticated Route] Any signed-in user may read their own buyer view.
#[utoipa::path(
    get,
    path = "/api/dashboard/buyer",
    responses((status = 200, description = "Buyer dashboard", body = BuyerDashboard))
)]
pub async fn buyer_dashboard(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BuyerDashboard>, ApiError> {
    Ok(Json(buyer_view(&state.repo, id).await?))
}

/// seller_dashboard
///
/// [Authenticated Route] The caller's own listings with summary stats.
///
/// *RBAC*: SELLER or ADMIN.
#[utoipa::path(
    get,
    path = "/api/dashboard/seller",
    responses(
        (status = 200, description = "Seller dashboard", body = SellerDashboard),
        (status = 403, description = "Not a seller", body = crate::error::ErrorBody)
    )
)]
pub async fn seller_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SellerDashboard>, ApiError> {
    if !user.has_role(Role::Seller) && !user.is_admin() {
        return Err(ApiError::forbidden());
    }
    Ok(Json(seller_view(&state.repo, user.id).await?))
}
