mod timetable;

pub use timetable::Timetable;
#[cfg(test)]
pub use timetable::Slot;

use super::{notification::NotificationService, request::RequestService, ServiceError};

/// Builds the digest of Pending requests and posts it to the admin chat.
#[derive(Clone)]
pub struct ReminderService {
    requests: RequestService,
    notifications: NotificationService,
}

impl ReminderService {
    pub fn new(requests: RequestService, notifications: NotificationService) -> Self {
        Self {
            requests,
            notifications,
        }
    }

    /// Returns how many requests the digest listed.
    pub async fn send_digest(&self) -> Result<usize, ServiceError> {
        let active = self.requests.all_active().await?;
        self.notifications.digest(&active).await?;

        info!("Digest with {} active requests sent to admin chat", active.len());
        Ok(active.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        service::{
            request::{Amount, Decision, NewRequest},
            user::User,
        },
        storage::{test_repository, Repository},
        transport::mock::MockMessenger,
    };

    #[tokio::test]
    async fn test_digest_lists_only_pending_requests() {
        let config = AppConfig::new_test_config();
        let repo = test_repository().await;
        for user_id in [1, 2] {
            repo.add_user(&User {
                user_id,
                name: format!("User {}", user_id),
                phone: "+380500000000".to_string(),
                city: "Kyiv".to_string(),
            })
            .await
            .unwrap();
        }

        let messenger = Arc::new(MockMessenger::default());
        let requests = RequestService::new(Arc::new(repo));
        let notifications = NotificationService::new(messenger.clone(), config.admin, config.request.currencies);
        let reminder = ReminderService::new(requests.clone(), notifications);

        let mut ids = Vec::new();
        for (user_id, comment) in [(1, "fuel"), (2, "hotel"), (2, "tickets")] {
            let submitted = requests
                .submit(NewRequest {
                    user_id,
                    currency: "UAH".to_string(),
                    amount: Amount::parse("100").unwrap(),
                    comment: comment.to_string(),
                    file_path: None,
                })
                .await
                .unwrap();
            ids.push(submitted.request_id);
        }
        requests.decide(ids[1], Decision::Reject, None).await.unwrap();

        assert_eq!(reminder.send_digest().await.unwrap(), 2);

        let digest = messenger.last_text_to(-100).unwrap();
        assert!(digest.contains("fuel"));
        assert!(digest.contains("tickets"));
        assert!(!digest.contains("hotel"));
    }

    #[tokio::test]
    async fn test_digest_without_active_requests() {
        let config = AppConfig::new_test_config();
        let messenger = Arc::new(MockMessenger::default());
        let reminder = ReminderService::new(
            RequestService::new(Arc::new(test_repository().await)),
            NotificationService::new(messenger.clone(), config.admin, config.request.currencies),
        );

        assert_eq!(reminder.send_digest().await.unwrap(), 0);
        assert_eq!(messenger.last_text_to(-100).unwrap(), t!("digest.empty"));
    }
}
