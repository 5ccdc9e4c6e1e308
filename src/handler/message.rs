use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    types::{FileMeta, Message, Update},
};

use crate::{
    error::HandlerResult,
    service::dialogue::Input,
    state::AppState,
    transport::{IncomingFile, IncomingFileKind},
};

fn photo_input(file: &FileMeta) -> Input {
    Input::File(IncomingFile {
        file_id: file.id.0.clone(),
        kind: IncomingFileKind::Photo {
            unique_id: file.unique_id.0.clone(),
        },
    })
}

fn document_input(file: &FileMeta, file_name: Option<&str>) -> Input {
    Input::File(IncomingFile {
        file_id: file.id.0.clone(),
        kind: IncomingFileKind::Document {
            file_name: file_name.unwrap_or("file").to_string(),
        },
    })
}

/// Maps a Telegram message onto dialogue input. Photos use the largest size.
fn input_from(msg: &Message) -> Input {
    if let Some(text) = msg.text() {
        return Input::Text(text.to_string());
    }

    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return photo_input(&photo.file);
    }

    if let Some(document) = msg.document() {
        return document_input(&document.file, document.file_name.as_deref());
    }

    Input::Other
}

async fn handle_message(msg: Message, state: AppState) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    state
        .services
        .workflow
        .on_reply(user.id.0 as i64, msg.chat.id.0, input_from(&msg))
        .await?;

    Ok(())
}

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message().endpoint(handle_message)
}
