use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::types::{Message, Update};

use crate::{command::Command, error::HandlerResult, state::AppState};

async fn handle_command(msg: Message, cmd: Command, state: AppState) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    debug!("User {} sent /{} in chat {}", user_id, cmd.name(), msg.chat.id);

    state.services.workflow.on_command(user_id, msg.chat.id.0, cmd).await?;

    Ok(())
}

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command)
}
