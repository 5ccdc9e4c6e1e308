use bot::BotService;
use config::AppConfig;

extern crate pretty_env_logger;
#[macro_use]
extern crate log;
#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

mod bot;
mod command;
mod config;
mod error;
mod handler;
mod runtime;
mod service;
mod state;
mod storage;
mod transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = pretty_env_logger::try_init_timed();

    info!("Starting bot...");

    let config = AppConfig::from_env()?;
    rust_i18n::set_locale(&config.locale);

    info!("Initializing BotService...");
    let bot_service = BotService::new(config).await?;
    info!("Bot instance created");

    bot_service
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Bot stopped with an error: {}", e))?;

    Ok(())
}
