use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{Car, CarFilter, CarList, CarResponse, CreateCarRequest, OkResponse, UpdateCarRequest},
};

/// ensure_can_manage
///
/// Listings may be changed by their owner or by an admin.
pub fn ensure_can_manage(car: &Car, user: &AuthUser) -> Result<(), ApiError> {
    if car.owner_id == user.id || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

async fn existing_car(state: &AppState, id: Uuid) -> Result<Car, ApiError> {
    state
        .repo
        .get_car(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))
}

/// list_cars
///
/// [Public Route] Lists listings, newest first. The brand filter is a
/// case-insensitive substring match; price and year bounds are inclusive.
#[utoipa::path(
    get,
    path = "/api/cars",
    params(CarFilter),
    responses((status = 200, description = "Filtered listings", body = CarList))
)]
pub async fn list_cars(
    State(state): State<AppState>,
    Query(filter): Query<CarFilter>,
) -> Result<Json<CarList>, ApiError> {
    let cars = state.repo.list_cars(&filter).await?;
    Ok(Json(CarList { cars }))
}

/// get_car
#[utoipa::path(
    get,
    path = "/api/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Found", body = CarResponse),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CarResponse>, ApiError> {
    let car = existing_car(&state, id).await?;
    Ok(Json(CarResponse { car }))
}

/// create_car
///
/// [Authenticated Route] Publishes a listing owned by the caller.
#[utoipa::path(
    post,
    path = "/api/cars",
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Created", body = CarResponse),
        (status = 400, description = "Missing or out-of-range fields", body = crate::error::ErrorBody)
    )
)]
pub async fn create_car(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCarRequest>,
) -> Result<(StatusCode, Json<CarResponse>), ApiError> {
    let draft = payload.into_draft(Utc::now().year())?;
    let car = state.repo.create_car(draft, user.id).await?;
    tracing::info!(car_id = %car.id, owner_id = %user.id, "listing created");
    Ok((StatusCode::CREATED, Json(CarResponse { car })))
}

/// update_car
///
/// [Authenticated Route] Partial update. Absent fields are left as they are.
///
/// *Authorization*: owner or ADMIN.
#[utoipa::path(
    put,
    path = "/api/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = UpdateCarRequest,
    responses(
        (status = 200, description = "Updated", body = CarResponse),
        (status = 400, description = "Out-of-range fields", body = crate::error::ErrorBody),
        (status = 403, description = "Not Owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_car(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCarRequest>,
) -> Result<Json<CarResponse>, ApiError> {
    payload.validate(Utc::now().year())?;
    let existing = existing_car(&state, id).await?;
    ensure_can_manage(&existing, &user)?;

    let car = state
        .repo
        .update_car(id, payload)
        .await?
        // Deleted between the lookup and the update.
        .ok_or_else(|| ApiError::not_found("Not found"))?;
    Ok(Json(CarResponse { car }))
}

/// delete_car
///
/// [Authenticated Route] Removes a listing. Favorites pointing at it go with it.
///
/// *Authorization*: owner or ADMIN.
#[utoipa::path(
    delete,
    path = "/api/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 403, description = "Not Owner", body = crate::error::ErrorBody),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_car(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let existing = existing_car(&state, id).await?;
    ensure_can_manage(&existing, &user)?;

    if !state.repo.delete_car(id).await? {
        return Err(ApiError::not_found("Not found"));
    }
    tracing::info!(car_id = %id, by = %user.id, "listing deleted");
    Ok(Json(OkResponse::ok()))
}
