use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use chat_relay::{
    config::RelayConfig,
    handlers::{health::health_check, status::status_handler, websocket::chat_handler},
    services::{metrics::metrics, session_registry::SessionRegistry},
    AppState,
};
use tracing::info;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env().context("invalid RELAY_* configuration")?;

    info!("Starting chat relay");

    let app_state = AppState::new(SessionRegistry::with_outbound_buffer(
        config.outbound_buffer,
    ));

    info!("Server starting on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(TracingLogger::default())
            .route("/chat/{username}", web::get().to(chat_handler))
            .route("/health", web::get().to(health_check))
            .route("/status", web::get().to(status_handler))
            .route("/metrics", web::get().to(metrics_handler))
    })
    .workers(config.workers)
    .keep_alive(std::time::Duration::from_secs(30))
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("server terminated unexpectedly")
}

async fn metrics_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(metrics().render())
}
