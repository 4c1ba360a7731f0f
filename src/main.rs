use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use mybookmarks::config::{Cli, Config};
use mybookmarks::db::Database;
use mybookmarks::handler::AppState;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("mybookmarks.svc starting");

    let cfg = Config::load(args.config_path.as_deref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?args.config_path, "failed to load config");
        std::process::exit(1);
    });
    let db = Database::connect(&cfg.database).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    });
    if let Err(e) = db.migrate().await {
        tracing::error!(error = %e, "failed to migrate database");
        std::process::exit(1);
    }

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let base_path = cfg.app.base_path();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let state = AppState {
        db: Arc::new(db),
        base_path: base_path.clone(),
    };
    let app = mybookmarks::app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("mybookmarks.svc running on {}{}/", &address, base_path);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(err) = served {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }

    tracing::info!("mybookmarks.svc going off, graceful shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    tracing::info!("ctrl+c signal received, preparing to shutdown");
}
