//! Follower repository.
//!
//! Follow edges are status-bearing rows, one per ordered (follower, followee)
//! pair. They are never hard-deleted; transitions write the new status.

use std::sync::Arc;

use crate::entities::{
    follower::{self, FollowStatus},
    Follower,
};
use chrono::Utc;
use feedline_common::{AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Follower repository for database operations.
#[derive(Clone)]
pub struct FollowerRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowerRepository {
    /// Create a new follower repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the edge for an ordered (follower, followee) pair.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follower::Model>> {
        Follower::find()
            .filter(follower::Column::FollowerId.eq(follower_id))
            .filter(follower::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Status of the (follower, followee) edge; an absent row is `NotFollowing`.
    pub async fn status_of(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowStatus> {
        Ok(self
            .find_by_pair(follower_id, followee_id)
            .await?
            .map_or(FollowStatus::NotFollowing, |edge| edge.follow_status))
    }

    /// Check if a user is actively following another user.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.status_of(follower_id, followee_id).await? == FollowStatus::Following)
    }

    /// Create a new follow edge.
    pub async fn create(&self, model: follower::ActiveModel) -> AppResult<follower::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing follow edge.
    pub async fn update(&self, model: follower::ActiveModel) -> AppResult<follower::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Compare-and-set the edge status: the write only applies while the edge
    /// is still in `from`.
    ///
    /// Returns whether this call performed the transition. A `false` means a
    /// racing transition got there first; the caller must skip its side
    /// effects, which serializes the state machine per (follower, followee)
    /// pair.
    pub async fn transition_status(
        &self,
        follower_id: &str,
        followee_id: &str,
        from: FollowStatus,
        to: FollowStatus,
    ) -> AppResult<bool> {
        let result = Follower::update_many()
            .col_expr(follower::Column::FollowStatus, Expr::value(to))
            .col_expr(follower::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(follower::Column::FollowerId.eq(follower_id))
            .filter(follower::Column::FolloweeId.eq(followee_id))
            .filter(follower::Column::FollowStatus.eq(from))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected == 1)
    }

    /// All edges into a followee with the given status (oldest first).
    ///
    /// With `FollowStatus::Following` this enumerates the fan-out set for a
    /// new post; with `FollowStatus::Requested` the pending request queue.
    pub async fn find_by_followee_and_status(
        &self,
        followee_id: &str,
        status: FollowStatus,
    ) -> AppResult<Vec<follower::Model>> {
        Follower::find()
            .filter(follower::Column::FolloweeId.eq(followee_id))
            .filter(follower::Column::FollowStatus.eq(status))
            .order_by_asc(follower::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
