mod reminder;

pub use reminder::ReminderWorker;

use std::collections::HashMap;

use async_trait::async_trait;

use super::RuntimeError;

#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn start(&self) -> Result<(), RuntimeError>;
    async fn stop(&self) -> Result<(), RuntimeError>;
    fn is_running(&self) -> bool;
}

#[derive(Default)]
pub struct WorkerPool {
    workers: HashMap<String, Box<dyn Worker>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_worker<W: Worker + 'static>(&mut self, worker: W) {
        self.workers.insert(worker.name().to_string(), Box::new(worker));
    }

    pub async fn start_all(&self) -> Result<(), RuntimeError> {
        for (name, worker) in &self.workers {
            worker.start().await?;
            info!("Worker {} started", name);
        }
        Ok(())
    }

    pub async fn stop_all(&self) -> Result<(), RuntimeError> {
        for (name, worker) in &self.workers {
            if worker.is_running() {
                worker.stop().await?;
                info!("Worker {} stopped", name);
            }
        }
        Ok(())
    }
}
