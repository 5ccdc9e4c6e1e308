
use std::{path::PathBuf, sync::Arc};

use crate::{
    command::Command,
    config::AdminConfig,
    transport::{MessageRef, Messenger},
};

use super::{
    dialogue::{DialogueService, DialogueState, Input, RegistrationForm, Submission, Transition},
    export::ExportService,
    notification::{CallbackAction, NotificationService},
    request::{Decision, NewRequest, RequestError, RequestService},
    user::{Registration, User, UserService},
    ServiceError,
};

/// Routes commands, button presses and replies through the services.
#[derive(Clone)]
pub struct Workflow {
    pub(super) users: UserService,
    pub(super) requests: RequestService,
    pub(super) dialogues: DialogueService,
    pub(super) notifications: NotificationService,
    pub(super) export: ExportService,
    pub(super) messenger: Arc<dyn Messenger>,
    pub(super) admin: AdminConfig,
    pub(super) upload_dir: PathBuf,
}

impl Workflow {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin.is_admin(user_id)
    }

    pub async fn on_command(&self, user_id: i64, chat_id: i64, command: Command) -> Result<(), ServiceError> {
        self.dialogues.reset(user_id);

        if command.is_admin_only() && !self.is_admin(user_id) {
            warn!("User {} tried /{} without permission", user_id, command.name());
            self.notifications.permission_denied(chat_id).await?;
            return Ok(());
        }

        match command {
            Command::Start => {
                if self.users.is_registered(user_id).await? {
                    self.notifications.main_menu(chat_id).await?;
                } else {
                    self.notifications.registration_prompt(chat_id).await?;
                }
            }
            Command::Help => {
                self.notifications.help(chat_id, self.is_admin(user_id)).await?;
            }
            Command::Stats => {
                let stats = self.requests.stats().await?;
                self.notifications.stats(chat_id, &stats).await?;
                info!("Admin {} requested stats", user_id);
            }
            Command::ExportRequests => match self.export.export_ledger().await {
                Ok(path) => {
                    self.notifications.export_ready(chat_id, &path).await?;
                    info!("Admin {} exported the ledger", user_id);
                }
                Err(e) => {
                    error!("Ledger export for admin {} failed: {}", user_id, e);
                    self.notifications.export_failed(chat_id).await?;
                }
            },
            Command::ImportRequests => {
                self.notifications.import_started(chat_id).await?;
                info!("Admin {} started request import", user_id);
            }
        }

        Ok(())
    }

    pub async fn on_callback(
        &self,
        user_id: i64,
        chat_id: i64,
        message: MessageRef,
        data: &str,
    ) -> Result<(), ServiceError> {
        let action = match data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!("User {} pressed a button: {}", user_id, e);
                return Ok(());
            }
        };

        match action {
            CallbackAction::Register => {
                if self.users.is_registered(user_id).await? {
                    self.notifications.already_registered(chat_id).await?;
                } else {
                    self.dialogues.start(user_id, DialogueState::AwaitingName);
                    self.notifications.ask_name(chat_id).await?;
                }
            }
            CallbackAction::MakeRequest => {
                if self.users.is_registered(user_id).await? {
                    self.dialogues.start(user_id, DialogueState::AwaitingCurrency);
                    self.notifications.currency_menu(chat_id).await?;
                } else {
                    self.notifications.registration_prompt(chat_id).await?;
                }
            }
            CallbackAction::MyRequests => {
                let active = self.requests.active_for_user(user_id).await?;
                self.notifications.active_requests(chat_id, &active).await?;
            }
            CallbackAction::Currency(code) => {
                let transition = self.dialogues.advance(user_id, Input::Currency(code));
                self.apply(user_id, chat_id, transition, false).await?;
            }
            CallbackAction::SkipFile => {
                let transition = self.dialogues.advance(user_id, Input::SkipAttachment);
                self.apply(user_id, chat_id, transition, false).await?;
            }
            CallbackAction::Decide { request_id, decision } => {
                if !self.admin_action(user_id, chat_id, request_id).await? {
                    return Ok(());
                }
                self.decide(user_id, chat_id, request_id, decision, None, message)
                    .await?;
            }
            CallbackAction::ApproveWithComment { request_id } => {
                if !self.admin_action(user_id, chat_id, request_id).await? {
                    return Ok(());
                }
                match self.requests.ensure_pending(request_id).await {
                    Ok(_) => {
                        self.dialogues.start(
                            user_id,
                            DialogueState::AwaitingApprovalComment {
                                request_id,
                                card: message,
                            },
                        );
                        self.notifications.ask_approval_comment(chat_id).await?;
                        info!("Admin {} is commenting on request id {}", user_id, request_id);
                    }
                    Err(e) => self.decision_refused(chat_id, e).await?,
                }
            }
        }

        Ok(())
    }

    pub async fn on_reply(&self, user_id: i64, chat_id: i64, input: Input) -> Result<(), ServiceError> {
        let transition = self.dialogues.advance(user_id, input);
        // Outside private chats only replies the dialogue expects get an answer.
        self.apply(user_id, chat_id, transition, chat_id == user_id).await
    }

    async fn admin_action(&self, user_id: i64, chat_id: i64, request_id: i64) -> Result<bool, ServiceError> {
        if self.is_admin(user_id) {
            return Ok(true);
        }
        warn!(
            "User {} tried to decide request id {} without permission",
            user_id, request_id
        );
        self.notifications.permission_denied(chat_id).await?;
        Ok(false)
    }

    async fn apply(
        &self,
        user_id: i64,
        chat_id: i64,
        transition: Transition,
        answer_unexpected: bool,
    ) -> Result<(), ServiceError> {
        match transition {
            Transition::Ask(prompt) => self.notifications.ask(chat_id, &prompt).await?,
            Transition::Retry(rejection) => {
                warn!("Input of user {} rejected: {:?}", user_id, rejection);
                self.notifications.retry(chat_id, rejection).await?;
            }
            Transition::Register(form) => self.register(user_id, chat_id, form).await?,
            Transition::Submit(submission) => self.submit(user_id, chat_id, submission).await?,
            Transition::ApproveWithComment {
                request_id,
                card,
                comment,
            } => {
                self.decide(user_id, chat_id, request_id, Decision::Approve, Some(&comment), card)
                    .await?
            }
            Transition::Unexpected => {
                debug!("Nothing pending for user {}", user_id);
                if answer_unexpected {
                    self.notifications.unexpected_input(chat_id).await?;
                }
            }
        }
        Ok(())
    }

    async fn register(&self, user_id: i64, chat_id: i64, form: RegistrationForm) -> Result<(), ServiceError> {
        let user = User {
            user_id,
            name: form.name,
            phone: form.phone,
            city: form.city,
        };

        match self.users.register(user).await? {
            Registration::Created => self.notifications.registered(chat_id).await?,
            Registration::AlreadyRegistered => self.notifications.already_registered(chat_id).await?,
        }
        Ok(())
    }

    async fn submit(&self, user_id: i64, chat_id: i64, submission: Submission) -> Result<(), ServiceError> {
        let Submission {
            currency,
            amount,
            comment,
            attachment,
        } = submission;

        let file_path = match attachment {
            Some(file) => {
                let path = file.storage_path(&self.upload_dir, user_id);
                if let Err(e) = self.messenger.download_file(&file.file_id, &path).await {
                    error!("Failed to save attachment of user {}: {}", user_id, e);
                    self.dialogues.restore(
                        user_id,
                        DialogueState::AwaitingAttachment {
                            currency,
                            amount,
                            comment,
                        },
                    );
                    self.notifications.upload_failed(chat_id).await?;
                    return Ok(());
                }
                Some(path.to_string_lossy().to_string())
            }
            None => None,
        };

        let submitted = self
            .requests
            .submit(NewRequest {
                user_id,
                currency: currency.clone(),
                amount: amount.clone(),
                comment,
                file_path,
            })
            .await?;

        self.notifications
            .request_accepted(chat_id, submitted.request_number, &amount, &currency)
            .await?;

        let details = self.requests.details(submitted.request_id).await?;
        self.notifications.review_card(&details).await?;
        Ok(())
    }

    async fn decide(
        &self,
        admin_id: i64,
        chat_id: i64,
        request_id: i64,
        decision: Decision,
        admin_comment: Option<&str>,
        card: MessageRef,
    ) -> Result<(), ServiceError> {
        match self.requests.decide(request_id, decision, admin_comment).await {
            Ok(snapshot) => {
                let admin_name = self.notifications.admin_name(admin_id);
                self.notifications
                    .decision_made(card, &snapshot, decision.status(), &admin_name, admin_comment)
                    .await?;
                info!(
                    "Request #{} (id {}) {} by admin {}",
                    snapshot.request.request_number,
                    request_id,
                    decision.status(),
                    admin_id
                );
                Ok(())
            }
            Err(e) => self.decision_refused(chat_id, e).await,
        }
    }

    async fn decision_refused(&self, chat_id: i64, error: RequestError) -> Result<(), ServiceError> {
        match error {
            RequestError::AlreadyDecided { id, status } => {
                warn!("Request id {} is already {}", id, status);
                self.notifications.already_decided(chat_id, status).await?;
            }
            RequestError::NotFound(id) => {
                warn!("Request id {} not found", id);
                self.notifications.request_missing(chat_id).await?;
            }
            RequestError::Storage(e) => return Err(e.into()),
        }
        Ok(())
    }
}
