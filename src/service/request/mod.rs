mod error;
mod model;

pub use error::RequestError;
pub use model::*;

use std::sync::Arc;

use crate::storage::{Repository, StorageError};

/// Creates requests and applies admin decisions to them.
#[derive(Clone)]
pub struct RequestService {
    repository: Arc<dyn Repository>,
}

impl RequestService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        info!("Initializing RequestService...");
        Self { repository }
    }

    pub async fn submit(&self, request: NewRequest) -> Result<Submitted, RequestError> {
        let (request_id, request_number) = self.repository.add_request(&request).await?;

        info!(
            "Request #{} (id {}) from user {} created: {} {}, attachment: {}",
            request_number,
            request_id,
            request.user_id,
            request.amount,
            request.currency,
            request.file_path.as_deref().unwrap_or("none")
        );

        Ok(Submitted {
            request_id,
            request_number,
        })
    }

    pub async fn details(&self, request_id: i64) -> Result<RequestDetails, RequestError> {
        self.repository
            .get_request_info(request_id)
            .await?
            .ok_or(RequestError::NotFound(request_id))
    }

    /// Loads a request and fails unless it is still awaiting a decision.
    pub async fn ensure_pending(&self, request_id: i64) -> Result<RequestDetails, RequestError> {
        let details = self.details(request_id).await?;

        if details.request.status != RequestStatus::Pending {
            return Err(RequestError::AlreadyDecided {
                id: request_id,
                status: details.request.status,
            });
        }

        Ok(details)
    }

    /// Moves a Pending request to its final status and returns the record as it was before.
    pub async fn decide(
        &self,
        request_id: i64,
        decision: Decision,
        admin_comment: Option<&str>,
    ) -> Result<RequestDetails, RequestError> {
        let snapshot = self.ensure_pending(request_id).await?;
        let status = decision.status();

        let applied = self
            .repository
            .update_request_status(request_id, status, admin_comment)
            .await?;

        if !applied {
            // Lost a race with another decision between the read and the update.
            let current = self
                .repository
                .get_request_info(request_id)
                .await?
                .map(|details| details.request.status)
                .ok_or(RequestError::NotFound(request_id))?;
            return Err(RequestError::AlreadyDecided {
                id: request_id,
                status: current,
            });
        }

        info!(
            "Request #{} (id {}) of user {} is now {}",
            snapshot.request.request_number, request_id, snapshot.request.user_id, status
        );

        Ok(snapshot)
    }

    pub async fn active_for_user(&self, user_id: i64) -> Result<Vec<Request>, StorageError> {
        self.repository.get_active_requests(user_id).await
    }

    pub async fn all_active(&self) -> Result<Vec<RequestDetails>, StorageError> {
        self.repository.get_all_active_requests().await
    }

    pub async fn ledger(&self) -> Result<Vec<RequestDetails>, StorageError> {
        self.repository.get_ledger().await
    }

    pub async fn stats(&self) -> Result<RequestStats, StorageError> {
        Ok(RequestStats {
            total: self.repository.get_total_requests().await?,
            approved: self.repository.get_approved_requests().await?,
            rejected: self.repository.get_rejected_requests().await?,
            totals_by_currency: self.repository.get_total_amount_by_currency().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{service::user::User, storage::test_repository};

    async fn service_with_user(user_id: i64) -> RequestService {
        let repo = test_repository().await;
        repo.add_user(&User {
            user_id,
            name: "Ivan Petrenko".to_string(),
            phone: "+380501234567".to_string(),
            city: "Kyiv".to_string(),
        })
        .await
        .unwrap();
        RequestService::new(Arc::new(repo))
    }

    fn submission(user_id: i64, amount: &str) -> NewRequest {
        NewRequest {
            user_id,
            currency: "USD".to_string(),
            amount: Amount::parse(amount).unwrap(),
            comment: "taxi".to_string(),
            file_path: None,
        }
    }

    #[tokio::test]
    async fn test_nth_request_gets_number_n() {
        let service = service_with_user(42).await;
        for expected in 1..=5 {
            let submitted = service.submit(submission(42, "10")).await.unwrap();
            assert_eq!(submitted.request_number, expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_submissions_get_distinct_numbers() {
        let service = service_with_user(42).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.submit(submission(42, "1")).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().request_number);
        }
        numbers.sort();
        assert_eq!(numbers, (1..=8).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_decide_returns_prior_snapshot() {
        let service = service_with_user(42).await;
        let submitted = service.submit(submission(42, "250")).await.unwrap();

        let before = service.stats().await.unwrap();
        let snapshot = service
            .decide(submitted.request_id, Decision::Approve, None)
            .await
            .unwrap();
        let after = service.stats().await.unwrap();

        assert_eq!(snapshot.request.status, RequestStatus::Pending);
        assert_eq!(snapshot.request.request_number, 1);
        assert_eq!(snapshot.owner.name, "Ivan Petrenko");
        assert_eq!(after.approved, before.approved + 1);
        assert_eq!(after.total, before.total);
    }

    #[tokio::test]
    async fn test_second_decision_is_a_conflict() {
        let service = service_with_user(42).await;
        let submitted = service.submit(submission(42, "250")).await.unwrap();

        service
            .decide(submitted.request_id, Decision::Approve, Some("paid"))
            .await
            .unwrap();
        let err = service
            .decide(submitted.request_id, Decision::Reject, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RequestError::AlreadyDecided {
                status: RequestStatus::Approved,
                ..
            }
        ));
        let stats = service.stats().await.unwrap();
        assert_eq!((stats.approved, stats.rejected), (1, 0));
    }

    #[tokio::test]
    async fn test_decide_unknown_request() {
        let service = service_with_user(42).await;
        let err = service.decide(999, Decision::Reject, None).await.unwrap_err();
        assert!(matches!(err, RequestError::NotFound(999)));
    }
}
