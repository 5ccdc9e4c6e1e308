mod model;

pub use model::{Registration, User};

use std::{sync::Arc, time::Duration};

use crate::storage::{MemoryCache, Repository, StorageError};

/// Registration records with a positive-only cache in front of the store.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn Repository>,
    cache: MemoryCache<i64, bool>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>, capacity: u64, ttl: Duration) -> Self {
        info!("Initializing UserService...");
        Self {
            repository,
            cache: MemoryCache::new(capacity, ttl),
        }
    }

    pub async fn is_registered(&self, user_id: i64) -> Result<bool, StorageError> {
        if self.cache.get(&user_id).await.is_some() {
            return Ok(true);
        }

        let registered = self.repository.is_user_registered(user_id).await?;
        if registered {
            self.cache.set(user_id, true).await;
        }

        Ok(registered)
    }

    pub async fn register(&self, user: User) -> Result<Registration, StorageError> {
        let user_id = user.user_id;

        if self.is_registered(user_id).await? {
            return Ok(Registration::AlreadyRegistered);
        }

        let created = self.repository.add_user(&user).await?;
        self.cache.set(user_id, true).await;

        if created {
            info!("User {} registered, city: {}, phone: {}", user_id, user.city, user.phone);
            Ok(Registration::Created)
        } else {
            Ok(Registration::AlreadyRegistered)
        }
    }

    #[cfg(test)]
    pub async fn get_info(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        self.repository.get_user_info(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{test_repository, Repository};

    fn ivan() -> User {
        User {
            user_id: 42,
            name: "Ivan Petrenko".to_string(),
            phone: "+380501234567".to_string(),
            city: "Kyiv".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_twice_creates_one_record() {
        let repo = Arc::new(test_repository().await);
        let users = UserService::new(repo.clone(), 100, Duration::from_secs(600));

        assert!(!users.is_registered(42).await.unwrap());
        assert_eq!(users.register(ivan()).await.unwrap(), Registration::Created);
        assert_eq!(users.register(ivan()).await.unwrap(), Registration::AlreadyRegistered);
        assert!(users.is_registered(42).await.unwrap());
        assert_eq!(repo.get_total_requests().await.unwrap(), 0);
        assert_eq!(users.get_info(42).await.unwrap(), Some(ivan()));
    }

    #[tokio::test]
    async fn test_cache_miss_falls_through_to_store() {
        let repo = Arc::new(test_repository().await);
        repo.add_user(&ivan()).await.unwrap();

        let users = UserService::new(repo, 100, Duration::from_secs(600));
        assert!(users.is_registered(42).await.unwrap());
        assert!(!users.is_registered(43).await.unwrap());
    }
}
