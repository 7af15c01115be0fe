//! Server-rendered page endpoints. Each returns the JSON view model the page
//! is drawn from. The access policy layer has already vetted the caller's
//! role by the time these run; the checks below only cover what the policy
//! cannot see, such as listing ownership.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    handlers::{
        cars::ensure_can_manage,
        dashboard::{buyer_view, seller_view},
        filters::load_filter_options,
    },
    models::{
        AdminOverview, BuyerDashboard, CarFilter, CarResponse, FavoritesPage, FilterOptions,
        ProfilePage, SellerDashboard,
    },
};

const SELLER_DASHBOARD: &str = "/dashboard/seller";

/// GET /profile
pub async fn profile_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfilePage>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let cars = state.repo.cars_by_owner(id).await?;
    Ok(Json(ProfilePage { user, cars }))
}

/// GET /favorites
pub async fn favorites_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FavoritesPage>, ApiError> {
    let favorites = state.repo.list_favorites(id).await?;
    Ok(Json(FavoritesPage { favorites }))
}

/// GET /sell
///
/// Form options for a new listing.
pub async fn sell_page(_user: AuthUser, State(state): State<AppState>) -> Json<FilterOptions> {
    Json(load_filter_options(&state.repo).await)
}

/// edit_listing_page
///
/// GET /sell/edit/{id}. Owners and admins get the listing; everyone else,
/// and any request for a listing that does not exist, is sent back to the
/// seller dashboard.
pub async fn edit_listing_page(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let Some(car) = state.repo.get_car(id).await? else {
        return Ok(Redirect::temporary(SELLER_DASHBOARD).into_response());
    };
    if ensure_can_manage(&car, &user).is_err() {
        return Ok(Redirect::temporary(SELLER_DASHBOARD).into_response());
    }
    Ok(Json(CarResponse { car }).into_response())
}

/// GET /admin
///
/// Moderation overview: every account and every listing.
pub async fn admin_page(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminOverview>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden());
    }
    let users = state.repo.list_users().await?;
    let cars = state.repo.list_cars(&CarFilter::default()).await?;
    Ok(Json(AdminOverview { users, cars }))
}

/// GET /dashboard/seller
pub async fn seller_dashboard_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SellerDashboard>, ApiError> {
    Ok(Json(seller_view(&state.repo, id).await?))
}

/// GET /dashboard/buyer
pub async fn buyer_dashboard_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BuyerDashboard>, ApiError> {
    Ok(Json(buyer_view(&state.repo, id).await?))
}
