use autoshop::{
    AppState,
    catalog::{CarQueryClient, CatalogState},
    config::{AppConfig, Env},
    create_router,
    mail::{MailerState, NoopMailer, ResendMailer},
    media::{CloudinaryClient, MediaState},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, external collaborators and
/// the HTTP server, in that order.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "autoshop=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. External Collaborators
    let cloudinary = CloudinaryClient::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_upload_preset.clone(),
    );
    if !cloudinary.is_configured() {
        tracing::warn!("Cloudinary is not configured; uploads will answer 500");
    }
    let media = Arc::new(cloudinary) as MediaState;

    let mailer = match &config.resend_api_key {
        Some(key) => Arc::new(ResendMailer::new(key.clone(), config.email_from.clone())) as MailerState,
        None => {
            tracing::info!("RESEND_API_KEY not set; confirmation emails are disabled");
            Arc::new(NoopMailer) as MailerState
        }
    };

    let catalog = Arc::new(CarQueryClient::new(config.catalog_base_url.clone())) as CatalogState;

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        media,
        mailer,
        catalog,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("HTTP server terminated unexpectedly");
}
