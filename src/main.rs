use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use image_analyser::config::RUST_LOG;
use image_analyser::runtime::BedrockRuntime;
use image_analyser::server::{self, ServerOptions};
use image_analyser::settings::Settings;
use image_analyser::Analyser;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| RUST_LOG.into()))
        .init();

    let settings = Settings::load()?;
    info!("loaded settings: {settings:?}");

    // One Bedrock client for the life of the process
    let runtime = BedrockRuntime::from_settings(&settings).await;
    let analyser = web::Data::new(Analyser::new(Arc::new(runtime), settings.model_id.clone()));
    let options = ServerOptions::from(&settings);

    let listen_addr = settings.listen_addr();
    info!("image analyser listening on http://{listen_addr}");
    info!("  GET  /");
    info!("  POST /analyse");
    info!("  POST /api/analyse");
    info!("  GET  /health");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(server::configure(analyser.clone(), options.clone()))
    })
    .bind(&listen_addr)
    .with_context(|| format!("failed to bind {listen_addr}"))?
    .run()
    .await
    .context("server error")
}
