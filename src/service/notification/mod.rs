mod callback;

pub use callback::CallbackAction;

use std::{path::Path, sync::Arc};

use crate::{
    config::AdminConfig,
    service::{
        dialogue::{Prompt, Rejection},
        request::{Amount, Decision, Request, RequestDetails, RequestStats, RequestStatus},
    },
    transport::{outgoing_kind, Button, Keyboard, MessageRef, Messenger, OutgoingFile, TransportError},
};

/// Renders every user- and admin-facing message and hands it to the messenger.
#[derive(Clone)]
pub struct NotificationService {
    messenger: Arc<dyn Messenger>,
    admin: AdminConfig,
    currencies: Vec<String>,
}

/// Telegram rejects text messages longer than this many characters.
const MAX_MESSAGE_LEN: usize = 4096;

/// Packs `items` after `header` into as few messages as fit under `MAX_MESSAGE_LEN`.
/// Items are never split across messages; a single oversized item is cut short.
fn chunk_messages(header: &str, items: &[String], separator: &str) -> Vec<String> {
    let separator_len = separator.chars().count();
    let mut chunks = Vec::new();
    let mut current = header.to_string();
    let mut current_len = current.chars().count();

    for item in items {
        let item = if item.chars().count() > MAX_MESSAGE_LEN {
            let mut cut: String = item.chars().take(MAX_MESSAGE_LEN - 1).collect();
            cut.push('…');
            cut
        } else {
            item.clone()
        };
        let item_len = item.chars().count();

        if current_len > 0 && current_len + separator_len + item_len > MAX_MESSAGE_LEN {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str(separator);
            current_len += separator_len;
        }
        current.push_str(&item);
        current_len += item_len;
    }

    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

fn file_label(file_path: Option<&str>) -> String {
    match file_path {
        Some(_) => t!("review.file_attached").to_string(),
        None => t!("review.file_missing").to_string(),
    }
}

impl NotificationService {
    pub fn new(messenger: Arc<dyn Messenger>, admin: AdminConfig, currencies: Vec<String>) -> Self {
        info!("Initializing NotificationService...");
        Self {
            messenger,
            admin,
            currencies,
        }
    }

    pub fn admin_name(&self, user_id: i64) -> String {
        self.admin
            .display_name(user_id)
            .map(str::to_string)
            .unwrap_or_else(|| t!("review.default_admin").to_string())
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<MessageRef, TransportError> {
        self.messenger.send_message(chat_id, text, None).await
    }

    async fn send_chunked(
        &self,
        chat_id: i64,
        header: &str,
        items: &[String],
        separator: &str,
    ) -> Result<(), TransportError> {
        for chunk in chunk_messages(header, items, separator) {
            self.send(chat_id, &chunk).await?;
        }
        Ok(())
    }

    // Registration

    pub async fn registration_prompt(&self, chat_id: i64) -> Result<(), TransportError> {
        let keyboard = Keyboard::new(vec![vec![Button::callback(
            t!("buttons.register"),
            CallbackAction::Register.to_string(),
        )]]);
        self.messenger
            .send_message(chat_id, &t!("registration.prompt"), Some(keyboard))
            .await?;
        Ok(())
    }

    pub async fn ask_name(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("registration.ask_name")).await?;
        Ok(())
    }

    pub async fn registered(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("registration.done")).await?;
        self.main_menu(chat_id).await
    }

    pub async fn already_registered(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("registration.already")).await?;
        self.main_menu(chat_id).await
    }

    pub async fn main_menu(&self, chat_id: i64) -> Result<(), TransportError> {
        let keyboard = Keyboard::new(vec![
            vec![Button::callback(
                t!("buttons.make_request"),
                CallbackAction::MakeRequest.to_string(),
            )],
            vec![Button::callback(
                t!("buttons.my_requests"),
                CallbackAction::MyRequests.to_string(),
            )],
        ]);
        self.messenger
            .send_message(chat_id, &t!("menu.title"), Some(keyboard))
            .await?;
        Ok(())
    }

    // Request dialogue

    pub async fn currency_menu(&self, chat_id: i64) -> Result<(), TransportError> {
        let row = self
            .currencies
            .iter()
            .map(|code| Button::callback(code.as_str(), CallbackAction::Currency(code.clone()).to_string()))
            .collect();
        self.messenger
            .send_message(chat_id, &t!("request.ask_currency"), Some(Keyboard::new(vec![row])))
            .await?;
        Ok(())
    }

    pub async fn ask(&self, chat_id: i64, prompt: &Prompt) -> Result<(), TransportError> {
        match prompt {
            Prompt::Phone => self.send(chat_id, &t!("registration.ask_phone")).await?,
            Prompt::City => self.send(chat_id, &t!("registration.ask_city")).await?,
            Prompt::Amount => self.send(chat_id, &t!("request.ask_amount")).await?,
            Prompt::Comment => self.send(chat_id, &t!("request.ask_comment")).await?,
            Prompt::Attachment {
                currency,
                amount,
                comment,
            } => {
                let keyboard = Keyboard::new(vec![vec![Button::callback(
                    t!("buttons.skip"),
                    CallbackAction::skip_file_payload(currency, amount, comment),
                )]]);
                self.messenger
                    .send_message(chat_id, &t!("request.ask_attachment"), Some(keyboard))
                    .await?
            }
        };
        Ok(())
    }

    pub async fn retry(&self, chat_id: i64, rejection: Rejection) -> Result<(), TransportError> {
        let text = match rejection {
            Rejection::ExpectedText => t!("request.expected_text"),
            Rejection::InvalidAmount => t!("request.invalid_amount"),
            Rejection::UnsupportedFile => t!("request.unsupported_file"),
            Rejection::ExpectedAttachment => t!("request.expected_attachment"),
        };
        self.send(chat_id, &text).await?;
        Ok(())
    }

    pub async fn upload_failed(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("request.upload_failed")).await?;
        Ok(())
    }

    pub async fn request_accepted(
        &self,
        chat_id: i64,
        request_number: i64,
        amount: &Amount,
        currency: &str,
    ) -> Result<(), TransportError> {
        let text = t!(
            "request.accepted",
            number = request_number,
            amount = amount,
            currency = currency
        );
        self.send(chat_id, &text).await?;
        Ok(())
    }

    pub async fn active_requests(&self, chat_id: i64, requests: &[Request]) -> Result<(), TransportError> {
        if requests.is_empty() {
            self.send(chat_id, &t!("request.none_active")).await?;
            return Ok(());
        }

        let items: Vec<String> = requests
            .iter()
            .map(|request| {
                t!(
                    "request.active_item",
                    number = request.request_number,
                    amount = request.amount,
                    currency = request.currency,
                    comment = request.comment
                )
                .to_string()
            })
            .collect();
        let header = format!("{}\n", t!("request.active_header"));
        self.send_chunked(chat_id, &header, &items, "\n").await
    }

    // Admin review

    /// Sends the review card for a new request, followed by its attachment.
    pub async fn review_card(&self, details: &RequestDetails) -> Result<MessageRef, TransportError> {
        let request = &details.request;
        let text = t!(
            "review.card",
            number = request.request_number,
            name = details.owner.name,
            city = details.owner.city,
            phone = details.owner.phone,
            amount = request.amount,
            currency = request.currency,
            comment = request.comment,
            file = file_label(request.file_path.as_deref())
        );
        let keyboard = Keyboard::new(vec![
            vec![
                Button::callback(
                    t!("buttons.approve"),
                    CallbackAction::Decide {
                        request_id: request.id,
                        decision: Decision::Approve,
                    }
                    .to_string(),
                ),
                Button::callback(
                    t!("buttons.reject"),
                    CallbackAction::Decide {
                        request_id: request.id,
                        decision: Decision::Reject,
                    }
                    .to_string(),
                ),
            ],
            vec![Button::callback(
                t!("buttons.approve_with_comment"),
                CallbackAction::ApproveWithComment { request_id: request.id }.to_string(),
            )],
        ]);

        let card = self
            .messenger
            .send_message(self.admin.chat_id, &text, Some(keyboard))
            .await?;

        if let Some(file_path) = &request.file_path {
            let path = Path::new(file_path);
            if let Err(e) = self
                .messenger
                .send_file(self.admin.chat_id, path, outgoing_kind(path))
                .await
            {
                error!(
                    "Failed to forward attachment {} of request #{} (id {}): {}",
                    file_path, request.request_number, request.id, e
                );
            }
        }

        info!(
            "Review card for request #{} (id {}) sent to admin chat",
            request.request_number, request.id
        );

        Ok(card)
    }

    pub async fn ask_approval_comment(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("review.ask_comment")).await?;
        Ok(())
    }

    /// Edits the review card and notifies the owner. Only the notice is required to succeed.
    pub async fn decision_made(
        &self,
        card: MessageRef,
        snapshot: &RequestDetails,
        status: RequestStatus,
        admin_name: &str,
        admin_comment: Option<&str>,
    ) -> Result<(), TransportError> {
        let request = &snapshot.request;
        let label = status.label();

        let (card_text, notice) = match admin_comment {
            Some(comment) => (
                t!(
                    "review.decided_with_comment",
                    number = request.request_number,
                    name = snapshot.owner.name,
                    status = label,
                    admin = admin_name,
                    comment = comment
                ),
                t!(
                    "notice.decided_with_comment",
                    number = request.request_number,
                    status = label,
                    admin = admin_name,
                    comment = comment
                ),
            ),
            None => (
                t!(
                    "review.decided",
                    number = request.request_number,
                    name = snapshot.owner.name,
                    status = label,
                    admin = admin_name
                ),
                t!(
                    "notice.decided",
                    number = request.request_number,
                    status = label,
                    admin = admin_name
                ),
            ),
        };

        if let Err(e) = self.messenger.edit_message(card, &card_text).await {
            warn!(
                "Failed to update review card of request #{} (id {}): {}",
                request.request_number, request.id, e
            );
        }

        self.send(request.user_id, &notice).await?;
        Ok(())
    }

    pub async fn already_decided(&self, chat_id: i64, status: RequestStatus) -> Result<(), TransportError> {
        self.send(chat_id, &t!("review.already_decided", status = status.label()))
            .await?;
        Ok(())
    }

    pub async fn request_missing(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("review.not_found")).await?;
        Ok(())
    }

    // Admin commands

    pub async fn digest(&self, requests: &[RequestDetails]) -> Result<(), TransportError> {
        if requests.is_empty() {
            self.send(self.admin.chat_id, &t!("digest.empty")).await?;
            return Ok(());
        }

        let items: Vec<String> = requests
            .iter()
            .map(|details| {
                let request = &details.request;
                t!(
                    "digest.item",
                    number = request.request_number,
                    name = details.owner.name,
                    phone = details.owner.phone,
                    amount = request.amount,
                    currency = request.currency,
                    comment = request.comment,
                    file = file_label(request.file_path.as_deref()),
                    status = request.status.label()
                )
                .to_string()
            })
            .collect();

        self.send_chunked(self.admin.chat_id, &t!("digest.header"), &items, "\n\n")
            .await
    }

    pub async fn stats(&self, chat_id: i64, stats: &RequestStats) -> Result<(), TransportError> {
        let mut text = t!(
            "stats.summary",
            total = stats.total,
            approved = stats.approved,
            rejected = stats.rejected
        )
        .to_string();

        if !stats.totals_by_currency.is_empty() {
            text.push_str("\n\n");
            text.push_str(&t!("stats.currency_header"));
            for (currency, amount) in &stats.totals_by_currency {
                text.push('\n');
                text.push_str(&t!("stats.currency_line", currency = currency, amount = amount));
            }
        }

        self.send(chat_id, &text).await?;
        Ok(())
    }

    pub async fn export_ready(&self, chat_id: i64, path: &Path) -> Result<(), TransportError> {
        self.messenger.send_file(chat_id, path, OutgoingFile::Document).await
    }

    pub async fn export_failed(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("export.failed")).await?;
        Ok(())
    }

    pub async fn import_started(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("import.started")).await?;
        Ok(())
    }

    pub async fn permission_denied(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("errors.permission_denied")).await?;
        Ok(())
    }

    // General

    pub async fn help(&self, chat_id: i64, is_admin: bool) -> Result<(), TransportError> {
        let text = if is_admin {
            format!("{}\n\n{}", t!("commands.help"), t!("commands.help_admin"))
        } else {
            t!("commands.help").to_string()
        };
        self.send(chat_id, &text).await?;
        Ok(())
    }

    pub async fn unexpected_input(&self, chat_id: i64) -> Result<(), TransportError> {
        self.send(chat_id, &t!("errors.unexpected_input")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        config::AppConfig,
        service::user::User,
        transport::mock::{MockMessenger, Sent},
    };

    fn service(messenger: Arc<MockMessenger>) -> NotificationService {
        let config = AppConfig::new_test_config();
        NotificationService::new(messenger, config.admin, config.request.currencies)
    }

    fn details(file_path: Option<&str>) -> RequestDetails {
        RequestDetails {
            request: Request {
                id: 11,
                user_id: 42,
                request_number: 3,
                currency: "USD".to_string(),
                amount: Amount::parse("250").unwrap(),
                comment: "taxi".to_string(),
                file_path: file_path.map(str::to_string),
                status: RequestStatus::Pending,
                admin_comment: None,
                created_at: Utc::now(),
            },
            owner: User {
                user_id: 42,
                name: "Ivan Petrenko".to_string(),
                phone: "+380501234567".to_string(),
                city: "Kyiv".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_review_card_has_controls_bound_to_request_id() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());

        notifications.review_card(&details(None)).await.unwrap();

        let (text, keyboard) = messenger.messages_to(-100).pop().unwrap();
        assert!(text.contains("Ivan Petrenko"));
        assert!(text.contains("250 USD"));
        let payloads: Vec<String> = keyboard.unwrap().buttons().map(|b| b.data.clone()).collect();
        assert_eq!(payloads, vec!["approve_11", "reject_11", "approve_with_comment_11"]);
    }

    #[tokio::test]
    async fn test_review_card_forwards_attachment() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());

        notifications
            .review_card(&details(Some("uploads/42/photo.jpg")))
            .await
            .unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(
            &sent[1],
            Sent::File {
                chat_id: -100,
                kind: OutgoingFile::Photo,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_decision_shares_status_label() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());
        let card = MessageRef {
            chat_id: -100,
            message_id: 1,
        };

        notifications
            .decision_made(card, &details(None), RequestStatus::Rejected, "Olena", None)
            .await
            .unwrap();

        let label = RequestStatus::Rejected.label();
        let (_, card_text) = messenger.edits().pop().unwrap();
        let notice = messenger.last_text_to(42).unwrap();
        assert!(card_text.contains(&label));
        assert!(notice.contains(&label));
        assert!(notice.contains("3"));
        assert!(notice.contains("Olena"));
    }

    #[tokio::test]
    async fn test_failed_card_edit_still_notifies_owner() {
        let messenger = Arc::new(MockMessenger::with_failing_edits());
        let notifications = service(messenger.clone());
        let card = MessageRef {
            chat_id: -100,
            message_id: 1,
        };

        notifications
            .decision_made(card, &details(None), RequestStatus::Approved, "Olena", Some("paid"))
            .await
            .unwrap();

        assert!(messenger.edits().is_empty());
        assert!(messenger.last_text_to(42).unwrap().contains("paid"));
    }

    #[tokio::test]
    async fn test_empty_digest_says_so() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());

        notifications.digest(&[]).await.unwrap();

        assert_eq!(messenger.last_text_to(-100).unwrap(), t!("digest.empty"));
    }

    fn numbered(count: usize, comment_len: usize) -> Vec<RequestDetails> {
        (1..=count)
            .map(|n| {
                let mut entry = details(None);
                entry.request.id = n as i64;
                entry.request.request_number = n as i64;
                entry.request.comment = format!("trip-{}-{}", n, "x".repeat(comment_len));
                entry
            })
            .collect()
    }

    #[tokio::test]
    async fn test_long_digest_is_split_under_message_limit() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());

        notifications.digest(&numbered(60, 200)).await.unwrap();

        let texts: Vec<String> = messenger.messages_to(-100).into_iter().map(|(text, _)| text).collect();
        assert!(texts.len() > 1);
        assert!(texts[0].starts_with(&*t!("digest.header")));
        for text in &texts {
            assert!(text.chars().count() <= MAX_MESSAGE_LEN);
        }
        for n in 1..=60 {
            let marker = format!("trip-{}-", n);
            let hits: usize = texts.iter().map(|text| text.matches(&marker).count()).sum();
            assert_eq!(hits, 1, "request {} should appear exactly once", n);
        }
    }

    #[tokio::test]
    async fn test_long_active_list_is_split_under_message_limit() {
        let messenger = Arc::new(MockMessenger::default());
        let notifications = service(messenger.clone());
        let requests: Vec<Request> = numbered(80, 150).into_iter().map(|entry| entry.request).collect();

        notifications.active_requests(42, &requests).await.unwrap();

        let texts: Vec<String> = messenger.messages_to(42).into_iter().map(|(text, _)| text).collect();
        assert!(texts.len() > 1);
        assert!(texts.iter().all(|text| text.chars().count() <= MAX_MESSAGE_LEN));
        assert!(texts.last().unwrap().contains("trip-80-"));
    }

    #[test]
    fn test_short_lists_stay_in_one_message() {
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(chunk_messages("Header\n", &items, "\n"), vec!["Header\n\na\nb"]);
    }

    #[test]
    fn test_oversized_item_is_cut_to_fit() {
        let items = vec!["y".repeat(MAX_MESSAGE_LEN + 500), "tail".to_string()];

        let chunks = chunk_messages("Header", &items, "\n\n");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Header");
        assert_eq!(chunks[1].chars().count(), MAX_MESSAGE_LEN);
        assert!(chunks[1].ends_with('…'));
        assert_eq!(chunks[2], "tail");
    }

    #[tokio::test]
    async fn test_unknown_admin_falls_back_to_generic_name() {
        let notifications = service(Arc::new(MockMessenger::default()));
        assert_eq!(notifications.admin_name(7), "Olena");
        assert_eq!(notifications.admin_name(8), t!("review.default_admin"));
    }
}
