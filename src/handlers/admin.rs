use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{BanRequest, UserResponse},
};

/// set_user_banned
///
/// [Admin Route] Bans or unbans an account. A banned user's existing tokens
/// stop resolving on their next request.
///
/// *RBAC*: Strict enforcement of the ADMIN role before touching the repository.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/ban",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = BanRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody)
    )
)]
pub async fn set_user_banned(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden());
    }
    let updated = state
        .repo
        .set_user_banned(id, payload.banned)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(user_id = %id, banned = payload.banned, by = %user.id, "ban status changed");
    Ok(Json(UserResponse { user: updated }))
}
