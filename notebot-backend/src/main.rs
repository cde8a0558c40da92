use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod config;
mod controllers;
mod db;
mod models;
mod pagination;
mod telegram;
mod thoughts;
mod words;

use config::Config;
use db::Database;
use telegram::{ChatTransport, NoteWorkflow, TelegramClient};
use thoughts::{ThoughtRateLimiter, ThoughtRelay};

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    /// Conversational note authoring over the Telegram webhook
    pub workflow: Arc<NoteWorkflow>,
    pub thought_relay: Arc<ThoughtRelay>,
    pub thought_limiter: Arc<ThoughtRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<Database>, transport: Arc<dyn ChatTransport>) -> Self {
        let workflow = NoteWorkflow::new(
            db.clone(),
            transport.clone(),
            config.allowed_telegram_id.clone(),
            config.max_note_words,
            config.session_ttl(),
        );
        let thought_relay = ThoughtRelay::new(db.clone(), transport, config.allowed_telegram_id.clone());
        let thought_limiter = ThoughtRateLimiter::new(
            db.clone(),
            config.thought_rate_limit_max,
            config.thought_rate_limit_window_secs,
        );

        Self {
            db,
            config,
            workflow: Arc::new(workflow),
            thought_relay: Arc::new(thought_relay),
            thought_limiter: Arc::new(thought_limiter),
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("Notebot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let port = config.port;

    log::info!("[DB] Opening database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(|e| {
        log::error!("[DB] Failed to open database: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    let db = Arc::new(db);

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramClient::new(
        &config.telegram_api_base,
        &config.telegram_bot_token,
    ));
    log::info!(
        "Word ceiling {}, session TTL {} min, thought limit {}/{}s",
        config.max_note_words,
        config.session_ttl_minutes,
        config.thought_rate_limit_max,
        config.thought_rate_limit_window_secs
    );
    if config.internal_api_token.is_none() {
        log::info!("INTERNAL_API_TOKEN not set, internal edit endpoint will reject all calls");
    }

    let state = web::Data::new(AppState::new(config, db, transport));

    log::info!("Starting HTTP server on 0.0.0.0:{}", port);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(controllers::health::config)
            .configure(controllers::notes::config)
            .configure(controllers::telegram::config)
            .configure(controllers::thoughts::config)
            .default_service(web::to(controllers::not_found))
    })
    .bind(("0.0.0.0", port))?
    .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop).await.is_err() {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
