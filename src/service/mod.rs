use std::sync::Arc;

use dialogue::DialogueService;
use export::ExportService;
use notification::NotificationService;
use reminder::{ReminderService, Timetable};
use request::RequestService;
use user::UserService;
use workflow::Workflow;

use crate::{config::AppConfig, storage::Repository, transport::Messenger};

pub mod dialogue;
mod error;
pub mod export;
pub mod notification;
pub mod reminder;
pub mod request;
pub mod user;
pub mod workflow;

pub use error::ServiceError;

#[derive(Clone)]
pub struct ServiceRegistry {
    pub workflow: Workflow,
    pub reminder: ReminderService,
    pub timetable: Timetable,
}

impl ServiceRegistry {
    pub fn new(config: &AppConfig, repository: Arc<dyn Repository>, messenger: Arc<dyn Messenger>) -> Self {
        info!("Initializing service registry");

        let users = UserService::new(
            Arc::clone(&repository),
            config.cache.registration_capacity,
            config.cache.registration_ttl,
        );
        let requests = RequestService::new(repository);
        let dialogues = DialogueService::new();
        let notifications = NotificationService::new(
            Arc::clone(&messenger),
            config.admin.clone(),
            config.request.currencies.clone(),
        );
        let export = ExportService::new(requests.clone(), config.storage.export_dir.clone());
        let reminder = ReminderService::new(requests.clone(), notifications.clone());

        let workflow = Workflow {
            users,
            requests,
            dialogues,
            notifications,
            export,
            messenger,
            admin: config.admin.clone(),
            upload_dir: config.storage.upload_dir.clone(),
        };

        info!("Service registry initialized");

        Self {
            workflow,
            reminder,
            timetable: Timetable::workdays(config.reminder.timezone),
        }
    }
}
