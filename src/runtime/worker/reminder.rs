use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{sync::broadcast, time::MissedTickBehavior};

use crate::{
    runtime::RuntimeError,
    service::reminder::{ReminderService, Timetable},
};

use super::Worker;

const TICK: Duration = Duration::from_secs(1);

/// Posts the digest of active requests whenever the timetable comes due.
#[derive(Clone)]
pub struct ReminderWorker {
    name: String,
    reminder: ReminderService,
    timetable: Timetable,
    shutdown: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
}

impl ReminderWorker {
    pub fn new(name: &str, reminder: ReminderService, timetable: Timetable) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            name: name.to_string(),
            reminder,
            timetable,
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns whether a digest went out for the window `(prev, now]`.
    async fn tick(&self, prev: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.timetable.is_due(prev, now) {
            return false;
        }

        match self.reminder.send_digest().await {
            Ok(_) => true,
            Err(e) => {
                error!("Worker {} failed to send the digest: {}", self.name, e);
                false
            }
        }
    }
}

#[async_trait]
impl Worker for ReminderWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), RuntimeError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let worker = self.clone();
        let mut rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut prev = Utc::now();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        worker.tick(prev, now).await;
                        prev = now;
                    }
                    _ = rx.recv() => {
                        break;
                    }
                }
            }

            worker.running.store(false, Ordering::SeqCst);
            debug!("Worker {} loop exited", worker.name);
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), RuntimeError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.shutdown
            .send(())
            .map_err(|_| RuntimeError::Worker(format!("{} has no running loop", self.name)))?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;
    use crate::{
        config::AppConfig,
        service::{notification::NotificationService, reminder::Slot, request::RequestService},
        storage::test_repository,
        transport::mock::MockMessenger,
    };

    async fn worker(timetable: Timetable, messenger: Arc<MockMessenger>) -> ReminderWorker {
        let config = AppConfig::new_test_config();
        let reminder = ReminderService::new(
            RequestService::new(Arc::new(test_repository().await)),
            NotificationService::new(messenger, config.admin, config.request.currencies),
        );
        ReminderWorker::new("reminder", reminder, timetable)
    }

    #[tokio::test]
    async fn test_tick_sends_digest_when_due() {
        let now = Utc::now();
        let timetable = Timetable::new(
            chrono_tz::UTC,
            vec![Slot {
                weekday: now.weekday(),
                time: now.time(),
            }],
        );
        let messenger = Arc::new(MockMessenger::default());
        let worker = worker(timetable, messenger.clone()).await;

        assert!(worker.tick(now - chrono::Duration::seconds(1), now).await);
        assert!(!worker.tick(now, now + chrono::Duration::seconds(1)).await);
        assert_eq!(messenger.messages_to(-100).len(), 1);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let messenger = Arc::new(MockMessenger::default());
        let worker = worker(Timetable::new(chrono_tz::UTC, Vec::new()), messenger).await;

        worker.start().await.unwrap();
        worker.start().await.unwrap();
        assert!(worker.is_running());

        worker.stop().await.unwrap();
        assert!(!worker.is_running());
    }
}
