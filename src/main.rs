use std::sync::Arc;

mod config;
mod format;
mod gemini;
mod handler;
mod history;
mod image;
mod models;
mod prompt;

use config::Config;
use gemini::GeminiClient;
use handler::AppState;
use history::SqliteHistoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&config.upload_dir).unwrap();

    let store = Arc::new(SqliteHistoryStore::open(&config.database_path).unwrap());
    let model = Arc::new(GeminiClient::new(config.gemini_api_key.clone()).unwrap());
    let state = AppState {
        model,
        store,
        upload_dir: config.upload_dir.clone(),
    };

    let app = handler::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
