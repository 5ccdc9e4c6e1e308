//! Messaging capability consumed by the services: sending text and files,
//! editing earlier messages, and fetching files users attach.

mod http;
mod telegram;

pub use http::create_telegram_client;
pub use telegram::TelegramMessenger;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request error: {0}")]
    Request(String),
    #[error("Download error: {0}")]
    Download(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A message previously sent by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard as rows of callback buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    #[cfg(test)]
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutgoingFile {
    Photo,
    Document,
}

const SUPPORTED_EXTENSIONS: [&str; 9] = ["pdf", "jpg", "jpeg", "png", "txt", "doc", "docx", "xls", "xlsx"];
const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingFileKind {
    Photo { unique_id: String },
    Document { file_name: String },
}

/// A file attached to a user's reply, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub file_id: String,
    pub kind: IncomingFileKind,
}

impl IncomingFile {
    pub fn extension(&self) -> Option<String> {
        match &self.kind {
            IncomingFileKind::Photo { .. } => Some("jpg".to_string()),
            IncomingFileKind::Document { file_name } => Path::new(file_name)
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase()),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Location under `upload_dir`, namespaced by the uploading user.
    pub fn storage_path(&self, upload_dir: &Path, user_id: i64) -> PathBuf {
        let dir = upload_dir.join(user_id.to_string());
        match &self.kind {
            IncomingFileKind::Photo { unique_id } => dir.join(format!("{}.jpg", sanitize(unique_id))),
            IncomingFileKind::Document { file_name } => {
                let base = Path::new(file_name)
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| "file".to_string());
                dir.join(format!("{}_{}", uuid::Uuid::new_v4().simple(), sanitize(&base)))
            }
        }
    }
}

/// How a stored attachment should be forwarded.
pub fn outgoing_kind(path: &Path) -> OutgoingFile {
    let is_photo = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()));

    if is_photo {
        OutgoingFile::Photo
    } else {
        OutgoingFile::Document
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, TransportError>;

    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), TransportError>;

    async fn send_file(&self, chat_id: i64, path: &Path, kind: OutgoingFile) -> Result<(), TransportError>;

    /// Downloads a user's file to `destination`, creating parent directories.
    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<(), TransportError>;
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Message {
            chat_id: i64,
            text: String,
            keyboard: Option<Keyboard>,
            message: MessageRef,
        },
        Edit {
            message: MessageRef,
            text: String,
        },
        File {
            chat_id: i64,
            path: PathBuf,
            kind: OutgoingFile,
        },
    }

    /// Records every outgoing call instead of talking to Telegram.
    #[derive(Default)]
    pub struct MockMessenger {
        sent: Mutex<Vec<Sent>>,
        next_id: Mutex<i32>,
        fail_edits: bool,
        fail_downloads: bool,
    }

    impl MockMessenger {
        pub fn with_failing_edits() -> Self {
            Self {
                fail_edits: true,
                ..Default::default()
            }
        }

        pub fn with_failing_downloads() -> Self {
            Self {
                fail_downloads: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }

        pub fn messages_to(&self, chat: i64) -> Vec<(String, Option<Keyboard>)> {
            self.sent()
                .into_iter()
                .filter_map(|sent| match sent {
                    Sent::Message {
                        chat_id, text, keyboard, ..
                    } if chat_id == chat => Some((text, keyboard)),
                    _ => None,
                })
                .collect()
        }

        pub fn last_text_to(&self, chat: i64) -> Option<String> {
            self.messages_to(chat).pop().map(|(text, _)| text)
        }

        pub fn edits(&self) -> Vec<(MessageRef, String)> {
            self.sent()
                .into_iter()
                .filter_map(|sent| match sent {
                    Sent::Edit { message, text } => Some((message, text)),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for MockMessenger {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            keyboard: Option<Keyboard>,
        ) -> Result<MessageRef, TransportError> {
            let message_id = {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                *next_id
            };
            let message = MessageRef { chat_id, message_id };
            self.sent.lock().unwrap().push(Sent::Message {
                chat_id,
                text: text.to_string(),
                keyboard,
                message,
            });
            Ok(message)
        }

        async fn edit_message(&self, message: MessageRef, text: &str) -> Result<(), TransportError> {
            if self.fail_edits {
                return Err(TransportError::Request("message to edit not found".to_string()));
            }
            self.sent.lock().unwrap().push(Sent::Edit {
                message,
                text: text.to_string(),
            });
            Ok(())
        }

        async fn send_file(&self, chat_id: i64, path: &Path, kind: OutgoingFile) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(Sent::File {
                chat_id,
                path: path.to_path_buf(),
                kind,
            });
            Ok(())
        }

        async fn download_file(&self, file_id: &str, destination: &Path) -> Result<(), TransportError> {
            if self.fail_downloads {
                return Err(TransportError::Download(format!("file {} unavailable", file_id)));
            }
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(destination, file_id.as_bytes()).await?;
            Ok(())
        }
    }
}
