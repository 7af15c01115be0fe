use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    access::Session,
    config::{AppConfig, Env},
    error::{ApiError, RepoError},
    models::{Role, User},
    repository::RepositoryState,
};

/// Name of the cookie carrying the session token for browser requests.
pub const SESSION_COOKIE: &str = "autoshop_session";

/// Development-only header naming a user id to act as.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. `role` is informational; the role that gates
/// access is always re-read from the user record.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub role: String,
    /// Expiration time (seconds since epoch).
    pub exp: usize,
    /// Issued at (seconds since epoch).
    pub iat: usize,
}

/// SessionError
///
/// Reasons a presented credential did not yield a session. All of them end in
/// an anonymous session; the distinction only matters for logs.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("session lookup failed: {0}")]
    Repository(#[from] RepoError),
    #[error("token subject {0} does not exist")]
    UnknownUser(Uuid),
    #[error("user {0} is banned")]
    Banned(Uuid),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// issue_token
///
/// Signs a session token for `user` that expires after `config.token_ttl`.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();
    let claims = Claims {
        sub: user.id,
        role: user.role.clone(),
        iat: now as usize,
        exp: (now + config.token_ttl.as_secs()) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth_secret.as_bytes()),
    )
}

/// Builds the `Set-Cookie` value for a freshly issued token.
pub fn session_cookie(token: &str, config: &AppConfig) -> String {
    let secure = if config.env == Env::Production { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
        config.token_ttl.as_secs()
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("autoshop_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

fn session_for(user: User) -> Result<Session, SessionError> {
    if user.banned {
        return Err(SessionError::Banned(user.id));
    }
    Ok(Session::Authenticated {
        user_id: user.id,
        role: user.role(),
    })
}

/// lookup_session
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing
///    user is accepted as-is.
/// 2. Credential: bearer token first, then the session cookie. No credential
///    means an anonymous session, not an error.
/// 3. Verification: signature and expiry, then the user record must exist and
///    not be banned. The stored role wins over the token's role claim.
async fn lookup_session(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Session, SessionError> {
    if config.env == Env::Local {
        let dev_user = parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = dev_user {
            if let Some(user) = repo.get_user(user_id).await? {
                return session_for(user);
            }
        }
    }

    let Some(token) = bearer_token(parts).or_else(|| cookie_token(parts)) else {
        return Ok(Session::Anonymous);
    };

    let key = DecodingKey::from_secret(config.auth_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let token_data = decode::<Claims>(token, &key, &validation)?;

    let user_id = token_data.claims.sub;
    let user = repo
        .get_user(user_id)
        .await?
        .ok_or(SessionError::UnknownUser(user_id))?;

    session_for(user)
}

/// resolve_session
///
/// The session resolver invoked once per request. Never fails: a bad
/// credential, a repository error or a lookup slower than
/// `config.session_timeout` all produce `Session::Anonymous`.
pub async fn resolve_session(parts: &Parts, repo: &RepositoryState, config: &AppConfig) -> Session {
    match tokio::time::timeout(config.session_timeout, lookup_session(parts, repo, config)).await {
        Ok(Ok(session)) => session,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "session rejected, continuing as anonymous");
            Session::Anonymous
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = config.session_timeout.as_millis() as u64,
                "session lookup timed out, continuing as anonymous"
            );
            Session::Anonymous
        }
    }
}

/// Session Extractor
///
/// Reuses the session the access middleware already resolved for this
/// request, and resolves it on the spot for routes outside the guarded set.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let session = resolve_session(parts, &repo, &config).await;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated API request. Used as a handler
/// argument; anonymous callers are rejected with 401 before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Option<Role>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}

impl TryFrom<Session> for AuthUser {
    type Error = ApiError;

    fn try_from(session: Session) -> Result<Self, Self::Error> {
        match session {
            Session::Authenticated { user_id, role } => Ok(AuthUser { id: user_id, role }),
            Session::Anonymous => Err(ApiError::Unauthorized),
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };
        AuthUser::try_from(session)
    }
}
