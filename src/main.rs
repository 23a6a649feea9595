//! TradePulse Auth Service entry point.
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tradepulse_auth::{
    config::Config,
    handlers::{self, health_check},
    openapi::ApiDoc,
    services::{AuthService, GoogleTokenVerifier, OAuthProvider, VerifierRegistry},
    store::PgAccountStore,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "Starting TradePulse Auth Service on {}:{}",
        config.server_host,
        config.server_port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&db_pool).await?;

    tracing::info!("Database connection pool initialized");

    let store = Arc::new(PgAccountStore::new(db_pool));
    let auth = Arc::new(AuthService::from_config(store, &config));

    let mut oauth = VerifierRegistry::new();
    if let Some(client_id) = config.google_client_id.clone() {
        oauth = oauth.register(
            OAuthProvider::Google,
            Box::new(GoogleTokenVerifier::new(client_id)),
        );
        tracing::info!("Google sign-in enabled");
    }

    let app_state = AppState {
        auth,
        oauth: Arc::new(oauth),
    };

    let router = Router::new()
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/oauth", post(handlers::oauth_sign_in))
        .route("/api/v1/auth/refresh-token", post(handlers::refresh_token))
        .route("/api/v1/auth/set-pin", put(handlers::set_pin))
        .route("/api/v1/auth/verify-pin", put(handlers::verify_pin))
        .route("/api/v1/auth/profile", put(handlers::update_profile))
        .route("/health", get(health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
