//! User service.
//!
//! Account creation and privacy transitions. The PRIVATE→PUBLIC transition
//! auto-accepts every pending follow request, which fans the owner's live
//! posts into each requester's feed through the regular accept path.

use chrono::Utc;
use feedline_common::{AppError, AppResult, IdGenerator};
use feedline_db::{
    entities::user::{self, PrivacyStatus},
    repositories::UserRepository,
};
use sea_orm::{IntoActiveModel, Set};

use crate::services::follower::FollowerService;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    follower_service: FollowerService,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, follower_service: FollowerService) -> Self {
        Self {
            user_repo,
            follower_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new user with a public account.
    pub async fn create_user(&self, username: &str) -> AppResult<user::Model> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }

        if self.user_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            username_lower: Set(username.to_lowercase()),
            privacy_status: Set(PrivacyStatus::Public),
            followers_count: Set(0),
            following_count: Set(0),
            followers_requested_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.user_repo.create(model).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Change a user's privacy status.
    ///
    /// Going public auto-accepts every pending follow request; going private
    /// leaves existing followers grandfathered.
    pub async fn set_privacy_status(
        &self,
        user_id: &str,
        status: PrivacyStatus,
    ) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let prior = user.privacy_status;
        if prior == status {
            return Ok(user);
        }

        let mut model = user.into_active_model();
        model.privacy_status = Set(status);
        model.updated_at = Set(Some(Utc::now().into()));
        let updated = self.user_repo.update(model).await?;

        if prior == PrivacyStatus::Private && status == PrivacyStatus::Public {
            let pending = self.follower_service.pending_requests(user_id).await?;
            for edge in &pending {
                self.follower_service
                    .accept_follower(user_id, &edge.follower_id)
                    .await?;
            }
            tracing::debug!(
                user_id,
                accepted = pending.len(),
                "Auto-accepted pending follow requests on going public"
            );
        }

        Ok(updated)
    }
}
