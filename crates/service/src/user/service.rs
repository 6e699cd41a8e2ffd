use std::sync::Arc;

use async_trait::async_trait;
use models::User;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::user::repository::UserRepository;

/// User business operations consumed by the HTTP layer.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, ServiceError>;
    async fn get_user(&self, email: &str) -> Result<User, ServiceError>;
    /// Full replacement of the user stored under `user.email`.
    async fn update_user(&self, user: User) -> Result<User, ServiceError>;
    async fn delete_user(&self, email: &str) -> Result<(), ServiceError>;
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;
}

/// Validates payloads and delegates to a [`UserRepository`].
pub struct DefaultUserService<R: UserRepository> {
    repo: Arc<R>,
}

impl<R: UserRepository> DefaultUserService<R> {
    /// Build a service over `repo`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use models::User;
    /// use service::user::{repository::mock::MockUserRepository, DefaultUserService, UserService};
    /// let svc = DefaultUserService::new(Arc::new(MockUserRepository::default()));
    /// let created = tokio_test::block_on(svc.create_user(User::new("a@x.com", "A", 20))).unwrap();
    /// assert_eq!(created.email, "a@x.com");
    /// ```
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }
}

#[async_trait]
impl<R: UserRepository> UserService for DefaultUserService<R> {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: User) -> Result<User, ServiceError> {
        user.validate()?;
        self.repo.create(&user).await.map_err(|e| {
            warn!(error = %e, "create rejected");
            ServiceError::from(e)
        })?;
        info!("user_created");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, email: &str) -> Result<User, ServiceError> {
        Ok(self.repo.get_by_email(email).await?)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn update_user(&self, user: User) -> Result<User, ServiceError> {
        user.validate()?;
        self.repo.update(&user).await?;
        info!("user_updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, email: &str) -> Result<(), ServiceError> {
        self.repo.delete(email).await?;
        info!("user_deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.repo.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;
    use crate::user::repository::{mock::MockUserRepository, MemUserRepository};

    fn mock_service() -> DefaultUserService<MockUserRepository> {
        DefaultUserService::new(Arc::new(MockUserRepository::default()))
    }

    #[tokio::test]
    async fn user_service_flow() -> Result<(), anyhow::Error> {
        let svc = mock_service();
        let user = User::new("test@example.com", "Test User", 25);

        svc.create_user(user.clone()).await?;
        assert!(matches!(svc.create_user(user.clone()).await, Err(ServiceError::Conflict(_))));

        let got = svc.get_user(&user.email).await?;
        assert_eq!(got.name, "Test User");

        let renamed = User { name: "Updated Name".into(), ..user.clone() };
        svc.update_user(renamed).await?;
        assert_eq!(svc.get_user(&user.email).await?.name, "Updated Name");

        svc.delete_user(&user.email).await?;
        assert!(matches!(svc.get_user(&user.email).await, Err(ServiceError::NotFound(_))));

        svc.create_user(User::new("b@example.com", "B", 30)).await?;
        svc.create_user(User::new("a@example.com", "A", 20)).await?;
        let emails: Vec<String> = svc.list_users().await?.into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_user_errors_are_not_found() {
        let svc = mock_service();
        let err = svc.get_user("nonexistent@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(err.code(), 1003);

        let ghost = User::new("nonexistent@example.com", "Test", 25);
        assert!(matches!(svc.update_user(ghost).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete_user("nonexistent@example.com").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_repository() -> Result<(), anyhow::Error> {
        let repo = Arc::new(MockUserRepository::default());
        let svc = DefaultUserService::new(Arc::clone(&repo));

        let err = svc.create_user(User::new("not-an-email", "X", 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(matches!(svc.create_user(User::new("a@x.com", " ", 1)).await, Err(ServiceError::Validation(_))));
        assert!(matches!(svc.create_user(User::new("a@x.com", "A", -1)).await, Err(ServiceError::Validation(_))));
        assert!(repo.list().await?.is_empty());

        svc.create_user(User::new("a@x.com", "A", 1)).await?;
        let err = svc.update_user(User::new("a@x.com", "A", 200)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(repo.get_by_email("a@x.com").await?.age, 1);
        Ok(())
    }

    #[tokio::test]
    async fn example_scenario_against_mem_store() -> Result<(), anyhow::Error> {
        let repo = Arc::new(MemUserRepository::new(Arc::new(MemStore::new())));
        let svc = DefaultUserService::new(repo);

        svc.create_user(User::new("a@x.com", "A", 20)).await?;
        let dup = svc.create_user(User::new("a@x.com", "A", 20)).await.unwrap_err();
        assert_eq!(dup, ServiceError::Conflict("user a@x.com already exists".into()));

        svc.update_user(User::new("a@x.com", "A2", 21)).await?;
        assert_eq!(svc.get_user("a@x.com").await?, User::new("a@x.com", "A2", 21));

        svc.delete_user("a@x.com").await?;
        assert!(matches!(svc.get_user("a@x.com").await, Err(ServiceError::NotFound(_))));
        assert!(svc.list_users().await?.is_empty());
        Ok(())
    }
}
