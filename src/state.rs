use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::Bot;

use crate::{
    config::AppConfig,
    error::BotResult,
    runtime::{ReminderWorker, WorkerPool},
    service::ServiceRegistry,
    storage::{Repository, TursoClient, TursoRepository},
    transport::{Messenger, TelegramMessenger},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: ServiceRegistry,
    pub workers: Arc<WorkerPool>,
}

impl AppState {
    pub async fn new(config: AppConfig, bot: Throttle<Bot>) -> BotResult<Self> {
        let client = TursoClient::open(&config.storage).await?;
        let repository = TursoRepository::new(client);
        repository.migrate().await?;

        let repository: Arc<dyn Repository> = Arc::new(repository);
        let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot));

        let services = ServiceRegistry::new(&config, repository, messenger);

        let mut workers = WorkerPool::new();
        workers.add_worker(ReminderWorker::new(
            "reminder",
            services.reminder.clone(),
            services.timetable.clone(),
        ));

        Ok(Self {
            config,
            services,
            workers: Arc::new(workers),
        })
    }

    pub async fn start_workers(&self) -> BotResult<()> {
        self.workers.start_all().await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> BotResult<()> {
        info!("Stopping workers...");
        self.workers.stop_all().await?;
        Ok(())
    }
}
