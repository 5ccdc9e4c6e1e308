use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::CallbackQuery,
};

use crate::{bot::TelegramBot, error::HandlerResult, state::AppState, transport::MessageRef};

async fn handle_callback(bot: TelegramBot, q: CallbackQuery, state: AppState) -> HandlerResult<()> {
    bot.answer_callback_query(q.id.clone()).cache_time(1).await?;

    // Inline-mode buttons carry no message and are not ours.
    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        return Ok(());
    };

    let message = MessageRef {
        chat_id: message.chat().id.0,
        message_id: message.id().0,
    };

    state
        .services
        .workflow
        .on_callback(q.from.id.0 as i64, message.chat_id, message, data)
        .await?;

    Ok(())
}

pub fn get_callback_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_callback_query().endpoint(handle_callback)
}
