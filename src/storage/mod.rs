mod error;
mod memory;
mod turso;

pub use error::StorageError;
pub use memory::MemoryCache;
pub use turso::{TursoClient, TursoRepository};

#[cfg(test)]
pub(crate) use turso::test_repository;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::service::{
    request::{NewRequest, Request, RequestDetails, RequestStatus},
    user::User,
};

/// Durable record store for users and requests.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn is_user_registered(&self, user_id: i64) -> Result<bool, StorageError>;

    /// Returns `false` when a record for this user already existed.
    async fn add_user(&self, user: &User) -> Result<bool, StorageError>;

    async fn get_user_info(&self, user_id: i64) -> Result<Option<User>, StorageError>;

    /// Persists a Pending request and returns `(id, request_number)`.
    async fn add_request(&self, request: &NewRequest) -> Result<(i64, i64), StorageError>;

    /// Applies the status only while the request is still Pending. Returns whether it applied.
    async fn update_request_status(
        &self,
        request_id: i64,
        status: RequestStatus,
        admin_comment: Option<&str>,
    ) -> Result<bool, StorageError>;

    async fn get_request_info(&self, request_id: i64) -> Result<Option<RequestDetails>, StorageError>;

    async fn get_active_requests(&self, user_id: i64) -> Result<Vec<Request>, StorageError>;

    async fn get_all_active_requests(&self) -> Result<Vec<RequestDetails>, StorageError>;

    async fn get_total_requests(&self) -> Result<u64, StorageError>;

    async fn get_approved_requests(&self) -> Result<u64, StorageError>;

    async fn get_rejected_requests(&self) -> Result<u64, StorageError>;

    async fn get_total_amount_by_currency(&self) -> Result<BTreeMap<String, u128>, StorageError>;

    /// Every request with its owner, ordered by id.
    async fn get_ledger(&self) -> Result<Vec<RequestDetails>, StorageError>;
}
