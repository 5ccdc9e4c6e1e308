use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::Bot;

use crate::command;
use crate::config::AppConfig;
use crate::error::{BotResult, HandlerResult};
use crate::handler::get_handler;
use crate::state::AppState;
use crate::transport::create_telegram_client;

pub type TelegramBot = Throttle<Bot>;

pub struct BotService {
    pub bot: TelegramBot,
    pub state: AppState,
}

impl BotService {
    pub async fn new(config: AppConfig) -> BotResult<Self> {
        let client = create_telegram_client()?;
        let bot = Bot::with_client(config.telegram.0.clone(), client).throttle(Limits::default());

        info!("Initializing AppState...");
        let state = AppState::new(config, bot.clone()).await?;
        info!("AppState initialized");

        Ok(Self { bot, state })
    }

    pub async fn start(&self) -> HandlerResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(_) => info!("Successfully connected to Telegram API"),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        let bot = self.bot.clone();
        let state = self.state.clone();

        command::setup_user_commands(&bot).await?;
        command::setup_admin_commands(&bot, ChatId(state.config.admin.chat_id)).await?;
        for admin in &state.config.admin.users {
            if let Err(e) = command::setup_admin_commands(&bot, ChatId(admin.user_id)).await {
                // The admin has not opened a private chat with the bot yet.
                warn!("Failed to set admin commands for user {}: {}", admin.user_id, e);
            }
        }

        state.start_workers().await?;

        let handler = get_handler();

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![state.clone()])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        state.shutdown().await?;

        Ok(())
    }
}
