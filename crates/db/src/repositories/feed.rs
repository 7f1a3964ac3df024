//! Feed repository.
//!
//! Writes are idempotent: inserts upsert on the (user_id, post_id) unique
//! index with DO NOTHING, deletes match whatever rows exist. Applying the
//! same event twice therefore leaves the feed unchanged.

use std::sync::Arc;

use crate::entities::{feed_entry, FeedEntry};
use feedline_common::{AppError, AppResult};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Feed repository for database operations.
#[derive(Clone)]
pub struct FeedRepository {
    db: Arc<DatabaseConnection>,
}

impl FeedRepository {
    /// Create a new feed repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert feed entries, ignoring any that already exist.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn add_entries(&self, models: Vec<feed_entry::ActiveModel>) -> AppResult<u64> {
        if models.is_empty() {
            return Ok(0);
        }

        FeedEntry::insert_many(models)
            .on_conflict(
                OnConflict::columns([feed_entry::Column::UserId, feed_entry::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A viewer's feed entries, newest first.
    pub async fn find_by_viewer(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<feed_entry::Model>> {
        FeedEntry::find()
            .filter(feed_entry::Column::UserId.eq(user_id))
            .order_by_desc(feed_entry::Column::PostedAt)
            .order_by_desc(feed_entry::Column::PostSortId)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a viewer's feed contains a post.
    pub async fn has_entry(&self, user_id: &str, post_id: &str) -> AppResult<bool> {
        let entry = FeedEntry::find()
            .filter(feed_entry::Column::UserId.eq(user_id))
            .filter(feed_entry::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(entry.is_some())
    }

    /// Delete a post's entry from every feed (archive/expiry path).
    pub async fn delete_by_post(&self, post_id: &str) -> AppResult<u64> {
        let result = FeedEntry::delete_many()
            .filter(feed_entry::Column::PostId.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete every entry a viewer holds for a given author (revocation path).
    pub async fn delete_by_viewer_and_author(
        &self,
        user_id: &str,
        posted_by_user_id: &str,
    ) -> AppResult<u64> {
        let result = FeedEntry::delete_many()
            .filter(feed_entry::Column::UserId.eq(user_id))
            .filter(feed_entry::Column::PostedByUserId.eq(posted_by_user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
