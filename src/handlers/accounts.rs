use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{expired_session_cookie, issue_token, session_cookie},
    error::ApiError,
    models::{LoginRequest, LoginResponse, NewUser, OkResponse, RegisterRequest, Role, UserResponse},
};

const MIN_PASSWORD_LEN: usize = 6;
const BCRYPT_COST: u32 = 10;

/// normalize_email
///
/// Trims and lower-cases the address. Returns `None` unless it has a
/// non-empty local part and a dotted domain.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.contains(char::is_whitespace) {
        return None;
    }
    Some(email)
}

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::Internal("Server error".to_string())
        })
}

async fn verify_password(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "password verification task failed");
            false
        }
    }
}

/// register
///
/// [Public Route] Creates an account. The role defaults to BUYER; ADMIN
/// accounts cannot be self-registered.
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 400, description = "Invalid data", body = crate::error::ErrorBody),
        (status = 409, description = "Email taken", body = crate::error::ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = normalize_email(&payload.email).ok_or_else(|| ApiError::bad_request("Invalid data"))?;
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Invalid data"));
    }
    let role = payload.role.unwrap_or(Role::Buyer);
    if role == Role::Admin {
        return Err(ApiError::bad_request("Invalid data"));
    }

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(payload.password).await?;
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let user = state
        .repo
        .create_user(NewUser {
            email,
            name,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %role, "account registered");
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// login
///
/// [Public Route] Exchanges credentials for a session token. The token is
/// returned in the body and set as the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
        (status = 403, description = "Banned", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email).ok_or(ApiError::Unauthorized)?;
    let user = state
        .repo
        .get_user_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(payload.password, user.password_hash.clone()).await {
        return Err(ApiError::Unauthorized);
    }
    if user.banned {
        return Err(ApiError::Forbidden("Account is banned".to_string()));
    }

    let token = issue_token(&user, &state.config).map_err(|e| {
        tracing::error!(error = %e, "failed to sign session token");
        ApiError::Internal("Server error".to_string())
    })?;
    let cookie = session_cookie(&token, &state.config);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { token, user }),
    )
        .into_response())
}

/// logout
///
/// [Public Route] Clears the session cookie. Bearer tokens stay valid until
/// they expire.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Signed out", body = OkResponse))
)]
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(OkResponse::ok()),
    )
}
