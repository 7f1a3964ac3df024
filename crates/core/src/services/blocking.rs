//! Blocking service.
//!
//! Blocking supersedes follow state: creating a block severs both follow
//! edges through the regular unfollow path, which also purges the
//! materialized feed entries each user holds for the other.

use chrono::Utc;
use feedline_common::{AppError, AppResult, IdGenerator};
use feedline_db::{entities::blocking, repositories::BlockingRepository};
use sea_orm::Set;

use crate::services::follower::FollowerService;

/// Blocking service for business logic.
#[derive(Clone)]
pub struct BlockingService {
    blocking_repo: BlockingRepository,
    follower_service: FollowerService,
    id_gen: IdGenerator,
}

impl BlockingService {
    /// Create a new blocking service.
    #[must_use]
    pub const fn new(blocking_repo: BlockingRepository, follower_service: FollowerService) -> Self {
        Self {
            blocking_repo,
            follower_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Block a user.
    pub async fn block(&self, blocker_id: &str, blockee_id: &str) -> AppResult<blocking::Model> {
        if blocker_id == blockee_id {
            return Err(AppError::BadRequest("Cannot block yourself".to_string()));
        }

        if self.blocking_repo.is_blocking(blocker_id, blockee_id).await? {
            return Err(AppError::Conflict("Already blocking this user".to_string()));
        }

        // Sever both follow edges; unfollow is an idempotent no-op when
        // no active edge exists, and it purges the revoked feeds.
        self.follower_service.unfollow(blocker_id, blockee_id).await?;
        self.follower_service.unfollow(blockee_id, blocker_id).await?;

        let model = blocking::ActiveModel {
            id: Set(self.id_gen.generate()),
            blocker_id: Set(blocker_id.to_string()),
            blockee_id: Set(blockee_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let block = self.blocking_repo.create(model).await?;
        tracing::debug!(blocker_id, blockee_id, "User blocked");
        Ok(block)
    }

    /// Unblock a user. Severed follow edges are not restored.
    pub async fn unblock(&self, blocker_id: &str, blockee_id: &str) -> AppResult<()> {
        if !self.blocking_repo.is_blocking(blocker_id, blockee_id).await? {
            return Err(AppError::NotFound("Not blocking this user".to_string()));
        }

        self.blocking_repo.delete_by_pair(blocker_id, blockee_id).await?;
        tracing::debug!(blocker_id, blockee_id, "User unblocked");
        Ok(())
    }

    /// Check if a user is blocking another user.
    pub async fn is_blocking(&self, blocker_id: &str, blockee_id: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocking(blocker_id, blockee_id).await
    }

    /// Check if either user is blocking the other.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        self.blocking_repo.is_blocked_between(user_a, user_b).await
    }
}
