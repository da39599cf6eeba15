use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use primitive_bot::bot::{self, App};
use primitive_bot::config::BotConfig;
use primitive_bot::render::PrimitiveCli;
use primitive_bot::telegram::TelegramClient;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // LOG_FORMAT=json for log shippers
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting Primitive Telegram Bot");

    let config = BotConfig::from_env()?;
    tokio::fs::create_dir_all(&config.input_dir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;
    info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        workers = config.workers,
        "Storage ready"
    );

    let client = TelegramClient::new(Bot::new(config.token.clone()), config.poll_timeout_secs);
    let generator = PrimitiveCli::new(config.primitive_binary.clone());
    let app = App::new(client, generator, config);

    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(bot::run(Arc::clone(&app), shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown.cancel();
    dispatcher.await?;

    Ok(())
}
