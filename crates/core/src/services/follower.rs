//! Follower service.
//!
//! Owns every transition of the follow graph. Each visibility-affecting
//! transition applies its feed effect through [`FeedService`] before
//! returning, so callers observe their own mutation on the next read.
//!
//! Transitions are compare-and-set on the prior status: a racing mutation of
//! the same edge applies its count and feed side effects exactly once, and
//! the loser skips its own.

use chrono::Utc;
use feedline_common::{AppError, AppResult, IdGenerator};
use feedline_db::{
    entities::{
        follower::{self, FollowStatus},
        user::PrivacyStatus,
    },
    repositories::{BlockingRepository, FollowerRepository, UserRepository},
};
use sea_orm::Set;

use crate::services::feed::FeedService;

/// Follower service for follow-graph business logic.
#[derive(Clone)]
pub struct FollowerService {
    follower_repo: FollowerRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    feed: FeedService,
    id_gen: IdGenerator,
}

impl FollowerService {
    /// Create a new follower service.
    #[must_use]
    pub const fn new(
        follower_repo: FollowerRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
        feed: FeedService,
    ) -> Self {
        Self {
            follower_repo,
            user_repo,
            blocking_repo,
            feed,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user, or request to follow a private one.
    ///
    /// Public followee: the edge goes straight to `following` and their live
    /// posts fan into the follower's feed. Private followee: the edge goes to
    /// `requested` with no feed effect until accepted. A `denied` edge may be
    /// re-requested; re-requesting while `requested` is an idempotent no-op.
    pub async fn request_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<FollowStatus> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self
            .blocking_repo
            .is_blocked_between(follower_id, followee_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Cannot follow a blocked user".to_string(),
            ));
        }

        let followee = self.user_repo.get_by_id(followee_id).await?;
        self.user_repo.get_by_id(follower_id).await?;

        let edge = self.follower_repo.find_by_pair(follower_id, followee_id).await?;
        let prior = edge
            .as_ref()
            .map_or(FollowStatus::NotFollowing, |e| e.follow_status);

        match prior {
            FollowStatus::Following => {
                Err(AppError::Conflict("Already following".to_string()))
            }
            FollowStatus::Requested => Ok(FollowStatus::Requested),
            FollowStatus::NotFollowing | FollowStatus::Denied => {
                let next = if followee.privacy_status == PrivacyStatus::Private {
                    FollowStatus::Requested
                } else {
                    FollowStatus::Following
                };

                let applied = if edge.is_some() {
                    self.follower_repo
                        .transition_status(follower_id, followee_id, prior, next)
                        .await?
                } else {
                    self.create_edge(follower_id, followee_id, next).await?;
                    true
                };
                if !applied {
                    // A racing transition won; its side effects stand.
                    return Ok(next);
                }

                if next == FollowStatus::Following {
                    self.user_repo.increment_following_count(follower_id).await?;
                    self.user_repo.increment_followers_count(followee_id).await?;
                    self.feed
                        .handle_follow_granted(follower_id, followee_id)
                        .await?;
                } else {
                    self.user_repo
                        .increment_followers_requested_count(followee_id)
                        .await?;
                }

                tracing::debug!(follower_id, followee_id, status = ?next, "Follow requested");
                Ok(next)
            }
        }
    }

    /// Unfollow a user (or withdraw a pending request).
    ///
    /// Unfollowing without an active edge is an idempotent no-op.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowStatus> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot unfollow yourself".to_string()));
        }

        let prior = self.follower_repo.status_of(follower_id, followee_id).await?;

        if prior == FollowStatus::NotFollowing {
            return Ok(FollowStatus::NotFollowing);
        }

        if !self
            .follower_repo
            .transition_status(follower_id, followee_id, prior, FollowStatus::NotFollowing)
            .await?
        {
            // The edge moved under us; whoever moved it owns the side effects.
            return Ok(FollowStatus::NotFollowing);
        }

        match prior {
            FollowStatus::Following => {
                self.user_repo.decrement_following_count(follower_id).await?;
                self.user_repo.decrement_followers_count(followee_id).await?;
                self.feed
                    .handle_follow_revoked(follower_id, followee_id)
                    .await?;
            }
            FollowStatus::Requested => {
                self.user_repo
                    .decrement_followers_requested_count(followee_id)
                    .await?;
            }
            FollowStatus::Denied | FollowStatus::NotFollowing => {}
        }

        tracing::debug!(follower_id, followee_id, prior = ?prior, "Unfollowed");
        Ok(FollowStatus::NotFollowing)
    }

    /// Accept a pending follow request.
    pub async fn accept_follower(
        &self,
        followee_id: &str,
        follower_id: &str,
    ) -> AppResult<FollowStatus> {
        let prior = self.follower_repo.status_of(follower_id, followee_id).await?;

        if prior != FollowStatus::Requested {
            return Err(AppError::NotFound("Follow request not found".to_string()));
        }

        if !self
            .follower_repo
            .transition_status(
                follower_id,
                followee_id,
                FollowStatus::Requested,
                FollowStatus::Following,
            )
            .await?
        {
            return Err(AppError::NotFound("Follow request not found".to_string()));
        }

        self.user_repo
            .decrement_followers_requested_count(followee_id)
            .await?;
        self.user_repo.increment_following_count(follower_id).await?;
        self.user_repo.increment_followers_count(followee_id).await?;
        self.feed
            .handle_follow_granted(follower_id, followee_id)
            .await?;

        tracing::debug!(followee_id, follower_id, "Follow request accepted");
        Ok(FollowStatus::Following)
    }

    /// Deny a follow request, or revoke an already-accepted follower.
    ///
    /// Valid from `requested` and from `following` (an owner may change
    /// their mind after accepting); revoking an active follower also clears
    /// the follower's materialized feed of the owner's posts.
    pub async fn deny_follower(
        &self,
        followee_id: &str,
        follower_id: &str,
    ) -> AppResult<FollowStatus> {
        let prior = self.follower_repo.status_of(follower_id, followee_id).await?;

        if prior != FollowStatus::Requested && prior != FollowStatus::Following {
            return Err(AppError::NotFound("Follow request not found".to_string()));
        }

        if !self
            .follower_repo
            .transition_status(follower_id, followee_id, prior, FollowStatus::Denied)
            .await?
        {
            return Err(AppError::NotFound("Follow request not found".to_string()));
        }

        match prior {
            FollowStatus::Requested => {
                self.user_repo
                    .decrement_followers_requested_count(followee_id)
                    .await?;
            }
            FollowStatus::Following => {
                self.user_repo.decrement_following_count(follower_id).await?;
                self.user_repo.decrement_followers_count(followee_id).await?;
                self.feed
                    .handle_follow_revoked(follower_id, followee_id)
                    .await?;
            }
            FollowStatus::Denied | FollowStatus::NotFollowing => {}
        }

        tracing::debug!(followee_id, follower_id, prior = ?prior, "Follower denied");
        Ok(FollowStatus::Denied)
    }

    /// Current status of the (follower, followee) edge.
    pub async fn status_of(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowStatus> {
        self.follower_repo.status_of(follower_id, followee_id).await
    }

    /// Pending follow requests received by a user (oldest first).
    pub async fn pending_requests(&self, followee_id: &str) -> AppResult<Vec<follower::Model>> {
        self.follower_repo
            .find_by_followee_and_status(followee_id, FollowStatus::Requested)
            .await
    }

    /// Create the edge row on first contact; the unique (follower, followee)
    /// index rejects a racing duplicate.
    async fn create_edge(
        &self,
        follower_id: &str,
        followee_id: &str,
        status: FollowStatus,
    ) -> AppResult<follower::Model> {
        let model = follower::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            follow_status: Set(status),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        self.follower_repo.create(model).await
    }
}
