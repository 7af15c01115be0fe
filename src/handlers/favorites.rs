use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{FavoriteRequest, FavoriteResponse, OkResponse},
};

/// add_favorite
///
/// [Authenticated Route] Bookmarks a listing for the caller. Repeating the
/// call returns the existing favorite.
#[utoipa::path(
    post,
    path = "/api/favorites",
    request_body = FavoriteRequest,
    responses(
        (status = 201, description = "Favorited", body = FavoriteResponse),
        (status = 400, description = "carId missing", body = crate::error::ErrorBody),
        (status = 403, description = "Own listing", body = crate::error::ErrorBody),
        (status = 404, description = "Car not found", body = crate::error::ErrorBody)
    )
)]
pub async fn add_favorite(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteResponse>), ApiError> {
    let car_id = payload
        .car_id
        .ok_or_else(|| ApiError::bad_request("carId required"))?;

    let car = state
        .repo
        .get_car(car_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Car not found"))?;
    if car.owner_id == user_id {
        return Err(ApiError::Forbidden(
            "You cannot add your own listing to favorites".to_string(),
        ));
    }

    let favorite = state.repo.add_favorite(user_id, car_id).await?;
    Ok((StatusCode::CREATED, Json(FavoriteResponse { favorite })))
}

/// remove_favorite
#[utoipa::path(
    delete,
    path = "/api/favorites",
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "Removed", body = OkResponse),
        (status = 400, description = "carId missing", body = crate::error::ErrorBody),
        (status = 404, description = "Not a favorite", body = crate::error::ErrorBody)
    )
)]
pub async fn remove_favorite(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let car_id = payload
        .car_id
        .ok_or_else(|| ApiError::bad_request("carId required"))?;

    if !state.repo.remove_favorite(user_id, car_id).await? {
        return Err(ApiError::not_found("Favorite not found"));
    }
    Ok(Json(OkResponse::ok()))
}
