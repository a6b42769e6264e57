use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mathnook_api::chat_log::ChatLog;
use mathnook_api::config::SecretConfig;
use mathnook_api::routes;
use mathnook_api::secret::SecretService;
use mathnook_api::session::run_sweep_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathnook_server=debug,mathnook_api=debug,mathnook_db=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = SecretConfig::from_env()?;
    if config.uses_default_credentials() {
        warn!("SECRET_USERNAME/SECRET_PASSWORD are unset or still the demo defaults; do not deploy like this");
    }
    if config.uses_placeholder_jwt_secret() {
        warn!("MATHNOOK_JWT_SECRET is unset or a placeholder; caller identities can be forged");
    }

    let db_path = std::env::var("MATHNOOK_DB_PATH").unwrap_or_else(|_| "mathnook.db".into());
    let host = std::env::var("MATHNOOK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MATHNOOK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let static_dir = std::env::var("MATHNOOK_STATIC_DIR").ok().map(PathBuf::from);

    // Init database
    let db = Arc::new(mathnook_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let (chat_log, _chat_writer) = ChatLog::spawn(db.clone(), config.chat_log_capacity);
    let service = Arc::new(SecretService::new(&config, db, chat_log)?);

    // Background session sweep
    tokio::spawn(run_sweep_loop(service.sessions().clone(), config.sweep_interval));

    // Routes
    let mut app = Router::new()
        .route("/health", get(health))
        .merge(routes::router(service));

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Mathnook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
