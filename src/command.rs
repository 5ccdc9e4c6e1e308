use teloxide::{
    macros::BotCommands,
    payloads::SetMyCommandsSetters,
    prelude::Requester,
    types::{BotCommand, BotCommandScope, ChatId, Recipient},
};

use crate::{bot::TelegramBot, error::HandlerResult};

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    Start,
    Help,
    Stats,
    ExportRequests,
    ImportRequests,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Stats => "stats",
            Command::ExportRequests => "export_requests",
            Command::ImportRequests => "import_requests",
        }
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Command::Stats | Command::ExportRequests | Command::ImportRequests
        )
    }

    pub fn user_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", t!("commands.description.start")),
            BotCommand::new("help", t!("commands.description.help")),
        ]
    }

    pub fn admin_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", t!("commands.description.start")),
            BotCommand::new("help", t!("commands.description.help")),
            BotCommand::new("stats", t!("commands.description.stats")),
            BotCommand::new("export_requests", t!("commands.description.export_requests")),
            BotCommand::new("import_requests", t!("commands.description.import_requests")),
        ]
    }
}

pub async fn setup_user_commands(bot: &TelegramBot) -> HandlerResult<()> {
    bot.delete_my_commands().await?;
    bot.set_my_commands(Command::user_commands()).await?;
    Ok(())
}

/// Admin chats get the full command menu.
pub async fn setup_admin_commands(bot: &TelegramBot, chat_id: ChatId) -> HandlerResult<()> {
    bot.set_my_commands(Command::admin_commands())
        .scope(BotCommandScope::Chat {
            chat_id: Recipient::Id(chat_id),
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use teloxide::utils::command::BotCommands;

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "requestdesk_bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/export_requests", "requestdesk_bot").unwrap(),
            Command::ExportRequests
        );
        assert!(Command::parse("/language", "requestdesk_bot").is_err());
    }

    #[test]
    fn test_admin_only_commands() {
        assert!(!Command::Start.is_admin_only());
        assert!(!Command::Help.is_admin_only());
        assert!(Command::Stats.is_admin_only());
        assert!(Command::ExportRequests.is_admin_only());
        assert!(Command::ImportRequests.is_admin_only());
    }
}
