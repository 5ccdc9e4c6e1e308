use std::path::Path;

use async_trait::async_trait;
use teloxide::{
    adaptors::Throttle,
    net::Download,
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId},
    Bot,
};

use super::{Keyboard, MessageRef, Messenger, OutgoingFile, TransportError};

impl From<teloxide::RequestError> for TransportError {
    fn from(error: teloxide::RequestError) -> Self {
        TransportError::Request(error.to_string())
    }
}

impl From<teloxide::DownloadError> for TransportError {
    fn from(error: teloxide::DownloadError) -> Self {
        TransportError::Download(error.to_string())
    }
}

fn markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.text, button.data))
            .collect::<Vec<_>>()
    }))
}

/// Removes what an interrupted download left behind.
async fn discard_partial(destination: &Path) {
    if let Err(e) = tokio::fs::remove_file(destination).await {
        warn!("Failed to remove partial download {}: {}", destination.display(), e);
    }
}

/// `Messenger` backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Throttle<Bot>,
}

impl TelegramMessenger {
    pub fn new(bot: Throttle<Bot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let message = match keyboard {
            Some(keyboard) => request.reply_markup(markup(keyboard)).await?,
            None => request.await?,
        };

        Ok(MessageRef {
            chat_id: message.chat.id.0,
            message_id: message.id.0,
        })
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), TransportError> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await?;
        Ok(())
    }

    async fn send_file(&self, chat_id: i64, path: &Path, kind: OutgoingFile) -> Result<(), TransportError> {
        let file = InputFile::file(path.to_path_buf());
        match kind {
            OutgoingFile::Photo => {
                self.bot.send_photo(ChatId(chat_id), file).await?;
            }
            OutgoingFile::Document => {
                self.bot.send_document(ChatId(chat_id), file).await?;
            }
        }
        Ok(())
    }

    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<(), TransportError> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut target = tokio::fs::File::create(destination).await?;
        if let Err(e) = self.bot.inner().download_file(&file.path, &mut target).await {
            drop(target);
            discard_partial(destination).await;
            return Err(e.into());
        }

        debug!("Saved file {} to {}", file_id, destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::transport::Button;

    #[test]
    fn test_markup_keeps_rows_and_payloads() {
        let keyboard = Keyboard::new(vec![
            vec![Button::callback("Approve", "approve_5"), Button::callback("Reject", "reject_5")],
            vec![Button::callback("Approve with comment", "approve_with_comment_5")],
        ]);

        let markup = markup(keyboard);

        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "Approve with comment");
        assert_eq!(
            markup.inline_keyboard[0][1].kind,
            InlineKeyboardButtonKind::CallbackData("reject_5".to_string())
        );
    }

    #[tokio::test]
    async fn test_discard_partial_removes_file() {
        let dir = std::env::temp_dir().join(format!("requestdesk-partial-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("receipt.pdf");
        tokio::fs::write(&path, b"%PDF-1.").await.unwrap();

        discard_partial(&path).await;
        assert!(!path.exists());

        // Already gone: only logged.
        discard_partial(&path).await;

        let _ = std::fs::remove_dir_all(dir);
    }
}
