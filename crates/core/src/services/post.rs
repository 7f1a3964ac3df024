//! Post service.
//!
//! Post lifecycle: add (goes live immediately), archive by owner, and expiry
//! driven by an external scheduler. Every lifecycle change applies its feed
//! effect before returning.

use chrono::{DateTime, Duration, Utc};
use feedline_common::{AppError, AppResult, IdGenerator};
use feedline_db::{
    entities::post::{self, PostStatus},
    repositories::{PostRepository, UserRepository},
};
use sea_orm::{IntoActiveModel, Set};
use validator::Validate;

use crate::services::feed::FeedService;

/// Input for creating a post.
#[derive(Debug, Clone, Validate)]
pub struct AddPostInput {
    /// Client-generated post ID (UUID).
    #[validate(length(min = 1, max = 64))]
    pub post_id: String,
    /// Post text.
    #[validate(length(max = 5000))]
    pub text: Option<String>,
    /// URL of the stored post image.
    pub image_url: Option<String>,
    /// How long the post stays live; unlimited when absent.
    pub lifetime: Option<Duration>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    feed: FeedService,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(post_repo: PostRepository, user_repo: UserRepository, feed: FeedService) -> Self {
        Self {
            post_repo,
            user_repo,
            feed,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a post. It goes live immediately and fans into the feeds of the
    /// owner and all active followers before this returns.
    pub async fn add_post(&self, owner_id: &str, input: AddPostInput) -> AppResult<post::Model> {
        input.validate()?;
        self.user_repo.get_by_id(owner_id).await?;

        if self.post_repo.find_by_id(&input.post_id).await?.is_some() {
            return Err(AppError::Conflict("Post ID already in use".to_string()));
        }

        if let Some(lifetime) = input.lifetime {
            if lifetime <= Duration::zero() {
                return Err(AppError::Validation(
                    "Post lifetime must be positive".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let model = post::ActiveModel {
            id: Set(input.post_id.clone()),
            user_id: Set(owner_id.to_string()),
            text: Set(input.text),
            image_url: Set(input.image_url),
            post_status: Set(PostStatus::Completed),
            sort_id: Set(self.id_gen.generate()),
            posted_at: Set(now.into()),
            expires_at: Set(input.lifetime.map(|lt| (now + lt).into())),
        };

        let created = self.post_repo.create(model).await?;
        self.feed.handle_post_added(&created).await?;

        tracing::debug!(post_id = %created.id, owner_id, "Post added");
        Ok(created)
    }

    /// Get a post by ID.
    pub async fn get_post(&self, post_id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(post_id).await
    }

    /// Archive a post, removing it from every feed.
    pub async fn archive_post(&self, owner_id: &str, post_id: &str) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.user_id != owner_id {
            return Err(AppError::Forbidden(
                "Cannot archive another user's post".to_string(),
            ));
        }
        if !post.post_status.is_live() {
            return Err(AppError::BadRequest("Post is not live".to_string()));
        }

        let mut model = post.into_active_model();
        model.post_status = Set(PostStatus::Archived);
        let updated = self.post_repo.update(model).await?;

        self.feed.handle_post_removed(post_id).await?;
        tracing::debug!(post_id, owner_id, "Post archived");
        Ok(updated)
    }

    /// Expire a post (external scheduler trigger).
    ///
    /// Missing or already non-live posts are absorbed as no-ops so replayed
    /// expiry events are harmless.
    pub async fn expire_post(&self, post_id: &str) -> AppResult<Option<post::Model>> {
        let Some(post) = self.post_repo.find_by_id(post_id).await? else {
            tracing::debug!(post_id, "Expiry for unknown post ignored");
            return Ok(None);
        };
        if !post.post_status.is_live() {
            return Ok(None);
        }

        let mut model = post.into_active_model();
        model.post_status = Set(PostStatus::Deleted);
        let updated = self.post_repo.update(model).await?;

        self.feed.handle_post_removed(post_id).await?;
        tracing::debug!(post_id, "Post expired");
        Ok(Some(updated))
    }

    /// Expire every live post whose lifetime has elapsed as of `now`.
    ///
    /// Convenience sweep for the external scheduler; returns the number of
    /// posts expired.
    pub async fn expire_due_posts(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due = self.post_repo.find_expired(now).await?;
        let count = due.len();
        for post in due {
            self.expire_post(&post.id).await?;
        }
        Ok(count)
    }
}
