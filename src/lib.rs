use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request gating: the route access policy and the session it consumes.
pub mod access;
pub mod auth;

// Core application services and components.
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod media;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin, Pages).
pub mod routes;
use routes::{admin, authenticated, pages, public};
use auth::AuthUser;

// --- Public Re-exports ---

pub use catalog::{CarQueryClient, CatalogState, StaticCatalog};
pub use config::AppConfig;
pub use mail::{MailerState, NoopMailer, ResendMailer};
pub use media::{CloudinaryClient, MediaState, MockMediaHost};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document for the JSON API, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::accounts::register, handlers::accounts::login, handlers::accounts::logout,
        handlers::cars::list_cars, handlers::cars::get_car, handlers::cars::create_car,
        handlers::cars::update_car, handlers::cars::delete_car,
        handlers::favorites::add_favorite, handlers::favorites::remove_favorite,
        handlers::filters::filter_options, handlers::filters::filter_models,
        handlers::filters::filter_versions,
        handlers::dashboard::buyer_dashboard, handlers::dashboard::seller_dashboard,
        handlers::admin::set_user_banned,
        handlers::media::upload_image, handlers::contact::submit_contact,
    ),
    components(
        schemas(
            models::Role, models::User, models::Car, models::Favorite, models::FavoriteEntry,
            models::Message, models::CarDetails, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::CreateCarRequest, models::UpdateCarRequest,
            models::FavoriteRequest, models::BanRequest, models::UploadRequest,
            models::UploadResponse, models::ContactRequest, models::CarList,
            models::CarResponse, models::UserResponse, models::FavoriteResponse,
            models::OkResponse, models::ContactResponse, models::FilterOptions,
            models::ModelList, models::VersionList, models::BuyerDashboard,
            models::SellerStats, models::SellerDashboard, error::ErrorBody,
        )
    ),
    tags(
        (name = "autoshop", description = "Car marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for every service a handler may need. Cloned per
/// request; all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory doubles in tests).
    pub repo: RepositoryState,
    /// Image host used by the upload endpoint.
    pub media: MediaState,
    /// Outbound email for contact confirmations.
    pub mailer: MailerState,
    /// External make/model/trim catalog.
    pub catalog: CatalogState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MediaState {
    fn from_ref(app_state: &AppState) -> MediaState {
        app_state.media.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for CatalogState {
    fn from_ref(app_state: &AppState) -> CatalogState {
        app_state.catalog.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// access_middleware
///
/// Runs the route access policy in front of every route. Requests outside the
/// guarded prefixes pass straight through without a session lookup. Guarded
/// requests get their session resolved once; a redirect decision answers 307
/// with the computed `Location`, an allow decision stores the session in the
/// request extensions for the extractors downstream.
async fn access_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !access::is_guarded(request.uri().path()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let session = auth::resolve_session(&parts, &state.repo, &state.config).await;
    let decision = access::evaluate(&parts.uri, &parts.method, &session);

    if let Some(location) = decision.location() {
        tracing::debug!(
            method = %parts.method,
            path = parts.uri.path(),
            location = %location,
            "access policy redirect"
        );
        return Redirect::temporary(&location).into_response();
    }

    parts.extensions.insert(session);
    next.run(Request::from_parts(parts, body)).await
}

/// require_auth
///
/// Route layer for the JSON API routes that need a caller. The `AuthUser`
/// extractor rejects anonymous requests with 401 before the handler runs.
async fn require_auth(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing tree, the access policy layer and the
/// observability stack around the given state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_auth)),
        )
        .nest(
            "/api/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_auth)),
        )
        .merge(pages::page_routes())
        // The access policy wraps every route, including the fallback.
        .layer(middleware::from_fn_with_state(state.clone(), access_middleware))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request tracing span so every log line of one request
/// carries its method, uri and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
