//! Feed materialization and query service.
//!
//! Maintains the per-viewer materialized feed. Mutating services call the
//! `handle_*` event methods synchronously, so a read issued after a mutation
//! returns always observes its effect. All event application is idempotent
//! per (viewer, post): replays and races collapse into no-ops at the
//! (user_id, post_id) unique index.

use std::collections::HashMap;

use feedline_common::{config::FeedConfig, AppResult, IdGenerator};
use feedline_db::{
    entities::{feed_entry, follower::FollowStatus, post},
    repositories::{FeedRepository, FollowerRepository, PostRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::visibility::{BlockerStatus, FollowedStatus, VisibilityService};

/// Author projection attached to each feed item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedBy {
    pub user_id: String,
    pub blocker_status: BlockerStatus,
    pub followed_status: FollowedStatus,
}

/// A single item of a viewer's feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub post_id: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub posted_by: PostedBy,
}

/// Feed materializer and read path.
#[derive(Clone)]
pub struct FeedService {
    feed_repo: FeedRepository,
    post_repo: PostRepository,
    follower_repo: FollowerRepository,
    visibility: VisibilityService,
    config: FeedConfig,
    id_gen: IdGenerator,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        feed_repo: FeedRepository,
        post_repo: PostRepository,
        follower_repo: FollowerRepository,
        visibility: VisibilityService,
        config: FeedConfig,
    ) -> Self {
        Self {
            feed_repo,
            post_repo,
            follower_repo,
            visibility,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Event application ====================

    /// A follow became active: fan the owner's live posts into the viewer's feed.
    pub async fn handle_follow_granted(&self, viewer_id: &str, owner_id: &str) -> AppResult<()> {
        let posts = self.post_repo.find_live_by_user(owner_id).await?;
        let entries: Vec<feed_entry::ActiveModel> = posts
            .iter()
            .map(|p| self.entry_for(viewer_id, p))
            .collect();

        let inserted = self.add_in_batches(entries).await?;
        tracing::debug!(
            viewer_id,
            owner_id,
            inserted,
            "Fanned live posts into feed after follow grant"
        );
        Ok(())
    }

    /// A follow was revoked: drop every entry the viewer holds for the owner.
    pub async fn handle_follow_revoked(&self, viewer_id: &str, owner_id: &str) -> AppResult<()> {
        let deleted = self
            .feed_repo
            .delete_by_viewer_and_author(viewer_id, owner_id)
            .await?;
        tracing::debug!(viewer_id, owner_id, deleted, "Cleared feed after follow revocation");
        Ok(())
    }

    /// A post went live: insert it into the owner's own feed and every
    /// active follower's feed.
    ///
    /// An active follow edge implies visibility (blocking severs edges on
    /// both sides), so enumerating `following` edges is the visibility check.
    pub async fn handle_post_added(&self, post: &post::Model) -> AppResult<()> {
        if !post.post_status.is_live() {
            return Ok(());
        }

        let followers = self
            .follower_repo
            .find_by_followee_and_status(&post.user_id, FollowStatus::Following)
            .await?;

        let mut entries = Vec::with_capacity(followers.len() + 1);
        entries.push(self.entry_for(&post.user_id, post));
        for edge in &followers {
            entries.push(self.entry_for(&edge.follower_id, post));
        }

        let inserted = self.add_in_batches(entries).await?;
        tracing::debug!(
            post_id = %post.id,
            owner_id = %post.user_id,
            followers = followers.len(),
            inserted,
            "Fanned new post into feeds"
        );
        Ok(())
    }

    /// A post went non-live (archived or expired): remove it from every feed.
    pub async fn handle_post_removed(&self, post_id: &str) -> AppResult<()> {
        let deleted = self.feed_repo.delete_by_post(post_id).await?;
        tracing::debug!(post_id, deleted, "Removed post from feeds");
        Ok(())
    }

    // ==================== Read path ====================

    /// Read a user's personal feed.
    ///
    /// A feed is private to its owner regardless of follow or privacy state:
    /// any other requester gets `None`, never an error, so feed reads leak no
    /// existence information. Items come back newest first, enriched with the
    /// author's relationship statuses relative to the requester.
    pub async fn get_feed(
        &self,
        requester_id: &str,
        target_user_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Option<Vec<FeedItem>>> {
        if requester_id != target_user_id {
            tracing::debug!(requester_id, target_user_id, "Denied feed read by non-owner");
            return Ok(None);
        }

        let limit = limit
            .unwrap_or(self.config.page_limit)
            .min(self.config.page_limit);
        let entries = self.feed_repo.find_by_viewer(target_user_id, limit).await?;

        let post_ids: Vec<String> = entries.iter().map(|e| e.post_id.clone()).collect();
        let posts: HashMap<String, post::Model> = self
            .post_repo
            .find_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut authors: HashMap<String, PostedBy> = HashMap::new();
        let mut items = Vec::with_capacity(entries.len());
        for entry in &entries {
            // Entries can briefly outlive their post under a racing
            // archive/expiry; skip rather than fail the read.
            let Some(post) = posts.get(&entry.post_id) else {
                tracing::warn!(
                    viewer_id = target_user_id,
                    post_id = %entry.post_id,
                    "Feed entry references a missing post, skipping"
                );
                continue;
            };
            if !post.post_status.is_live() {
                continue;
            }

            let posted_by = match authors.get(&post.user_id) {
                Some(p) => p.clone(),
                None => {
                    let posted_by = PostedBy {
                        user_id: post.user_id.clone(),
                        blocker_status: self
                            .visibility
                            .blocker_status(requester_id, &post.user_id)
                            .await?,
                        followed_status: self
                            .visibility
                            .followed_status(requester_id, &post.user_id)
                            .await?,
                    };
                    authors.insert(post.user_id.clone(), posted_by.clone());
                    posted_by
                }
            };

            items.push(FeedItem {
                post_id: post.id.clone(),
                text: post.text.clone(),
                image_url: post.image_url.clone(),
                posted_by,
            });
        }

        Ok(Some(items))
    }

    // ==================== Helpers ====================

    fn entry_for(&self, viewer_id: &str, post: &post::Model) -> feed_entry::ActiveModel {
        feed_entry::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(viewer_id.to_string()),
            post_id: Set(post.id.clone()),
            posted_by_user_id: Set(post.user_id.clone()),
            posted_at: Set(post.posted_at),
            post_sort_id: Set(post.sort_id.clone()),
        }
    }

    async fn add_in_batches(&self, entries: Vec<feed_entry::ActiveModel>) -> AppResult<u64> {
        let mut inserted = 0;
        for chunk in entries
            .chunks(self.config.fanout_batch_size.max(1))
            .map(<[feed_entry::ActiveModel]>::to_vec)
        {
            inserted += self.feed_repo.add_entries(chunk).await?;
        }
        Ok(inserted)
    }
}
