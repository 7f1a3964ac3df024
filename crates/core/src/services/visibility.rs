//! Visibility resolver.
//!
//! Computes the effective visibility of one user's content for another from
//! the three relationship inputs: block edges, the owner's privacy level, and
//! the viewer's follow edge. Blocking supersedes everything; privacy gates
//! non-followers; an active follow grants visibility into a private account.

use feedline_common::AppResult;
use feedline_db::{
    entities::{follower::FollowStatus, user::PrivacyStatus},
    repositories::{BlockingRepository, FollowerRepository, UserRepository},
};
use serde::{Deserialize, Serialize};

/// Outcome of resolving (viewer, owner) visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// The viewer is the owner.
    #[serde(rename = "SELF")]
    SelfView,
    /// The owner's content may appear in the viewer's feed.
    Visible,
    /// The owner's content must not be shown to the viewer.
    Hidden,
}

/// Presentation status: is this user blocking the viewer?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockerStatus {
    #[serde(rename = "SELF")]
    SelfUser,
    Blocking,
    NotBlocking,
}

/// Presentation status: is the viewer following this user?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowedStatus {
    #[serde(rename = "SELF")]
    SelfUser,
    Following,
    Requested,
    NotFollowing,
    Denied,
}

impl From<FollowStatus> for FollowedStatus {
    fn from(status: FollowStatus) -> Self {
        match status {
            FollowStatus::Following => Self::Following,
            FollowStatus::Requested => Self::Requested,
            FollowStatus::Denied => Self::Denied,
            FollowStatus::NotFollowing => Self::NotFollowing,
        }
    }
}

/// Visibility resolver service.
#[derive(Clone)]
pub struct VisibilityService {
    user_repo: UserRepository,
    follower_repo: FollowerRepository,
    blocking_repo: BlockingRepository,
}

impl VisibilityService {
    /// Create a new visibility service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        follower_repo: FollowerRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            user_repo,
            follower_repo,
            blocking_repo,
        }
    }

    /// Resolve whether `owner`'s content is visible to `viewer`.
    ///
    /// Precedence: self, then blocks (either direction), then public
    /// accounts, then an active follow edge; everything else is hidden.
    pub async fn resolve(&self, viewer_id: &str, owner_id: &str) -> AppResult<Visibility> {
        if viewer_id == owner_id {
            return Ok(Visibility::SelfView);
        }

        if self
            .blocking_repo
            .is_blocked_between(viewer_id, owner_id)
            .await?
        {
            return Ok(Visibility::Hidden);
        }

        let owner = self.user_repo.get_by_id(owner_id).await?;
        if owner.privacy_status == PrivacyStatus::Public {
            return Ok(Visibility::Visible);
        }

        if self.follower_repo.is_following(viewer_id, owner_id).await? {
            return Ok(Visibility::Visible);
        }

        Ok(Visibility::Hidden)
    }

    /// Whether `other` is blocking `viewer` (presentation read).
    pub async fn blocker_status(&self, viewer_id: &str, other_id: &str) -> AppResult<BlockerStatus> {
        if viewer_id == other_id {
            return Ok(BlockerStatus::SelfUser);
        }

        if self.blocking_repo.is_blocking(other_id, viewer_id).await? {
            Ok(BlockerStatus::Blocking)
        } else {
            Ok(BlockerStatus::NotBlocking)
        }
    }

    /// The viewer's follow status towards `other` (presentation read).
    pub async fn followed_status(
        &self,
        viewer_id: &str,
        other_id: &str,
    ) -> AppResult<FollowedStatus> {
        if viewer_id == other_id {
            return Ok(FollowedStatus::SelfUser);
        }

        let status = self.follower_repo.status_of(viewer_id, other_id).await?;
        Ok(status.into())
    }
}
