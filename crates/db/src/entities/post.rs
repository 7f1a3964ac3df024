//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    /// Live: eligible for feed materialization.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Archived by its owner; no longer feed-eligible.
    #[sea_orm(string_value = "archived")]
    Archived,
    /// Expired past its lifetime; logically deleted.
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

impl PostStatus {
    /// Whether a post with this status belongs in feeds.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    /// Client-supplied post ID (UUID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner user ID
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Post text content
    #[sea_orm(column_type = "Text", nullable)]
    pub text: Option<String>,

    /// URL of the post image, once stored
    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    /// Lifecycle status
    pub post_status: PostStatus,

    /// Server-generated ULID; deterministic tiebreak for feed ordering
    pub sort_id: String,

    pub posted_at: DateTimeWithTimeZone,

    /// When the post expires, if it was given a lifetime
    #[sea_orm(nullable)]
    pub expires_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
