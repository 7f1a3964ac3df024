//! Follower entity (directed follow edges between users).
//!
//! Exactly one row exists per ordered (follower, followee) pair once a follow
//! has been attempted. Rows are never hard-deleted: unfollow transitions the
//! edge back to `not_following`, so edge history survives block/deny cycles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a directed follow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowStatus {
    /// The follow is active; the followee's posts fan into the follower's feed.
    #[sea_orm(string_value = "following")]
    Following,
    /// Awaiting accept/deny by a private followee.
    #[sea_orm(string_value = "requested")]
    Requested,
    /// The followee denied (or revoked) the follow.
    #[sea_orm(string_value = "denied")]
    Denied,
    /// No active relationship. Equivalent to an absent row.
    #[sea_orm(string_value = "not_following")]
    NotFollowing,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follower")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who is following
    pub follower_id: String,

    /// The user being followed
    pub followee_id: String,

    /// Current status of the edge
    pub follow_status: FollowStatus,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FollowerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    FollowerUser,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FolloweeId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    FolloweeUser,
}

impl ActiveModelBehavior for ActiveModel {}
