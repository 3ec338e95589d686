use std::sync::Arc;

use domains::{Creation, DomainError, DomainResult, User, UserPatch, UserProfile, UserRepository};
use tracing::{info, instrument};

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Registers a user, or reports every user whose nickname or email clashes.
    #[instrument(skip(self, profile))]
    pub async fn create(
        &self,
        nickname: &str,
        profile: UserProfile,
    ) -> DomainResult<Creation<User, Vec<User>>> {
        let user = profile.into_user(nickname);

        let clashes = self.users.find_conflicting(&user.nickname, &user.email).await?;
        if !clashes.is_empty() {
            return Ok(Creation::AlreadyExists(clashes));
        }

        match self.users.create_user(&user).await {
            Ok(()) => {
                info!(nickname = %user.nickname, "user registered");
                Ok(Creation::Created(user))
            }
            // lost a race against a concurrent registration
            Err(DomainError::Conflict(_)) => {
                let clashes = self.users.find_conflicting(&user.nickname, &user.email).await?;
                Ok(Creation::AlreadyExists(clashes))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, nickname: &str) -> DomainResult<User> {
        self.users
            .find_user(nickname)
            .await?
            .ok_or_else(|| DomainError::not_found("user", nickname))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, nickname: &str, patch: UserPatch) -> DomainResult<User> {
        let current = self.get(nickname).await?;
        let updated = patch.apply(current);
        self.users
            .update_user(&updated)
            .await?
            .ok_or_else(|| DomainError::not_found("user", nickname))
    }
}
