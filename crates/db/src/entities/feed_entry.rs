//! Feed entry entity (per-viewer materialized feed rows).
//!
//! Derived data: a row exists iff the post is live and visible to the viewer
//! at the time of the last event application. Rebuildable from the user,
//! follower and post tables; never the source of truth.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_entry")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The viewer whose feed this entry belongs to
    pub user_id: String,

    /// The post this entry points at
    pub post_id: String,

    /// The post's owner (denormalized for revocation by author)
    pub posted_by_user_id: String,

    /// Cached ordering key: when the post was created
    pub posted_at: DateTimeWithTimeZone,

    /// Cached ordering tiebreak: the post's sort ULID
    pub post_sort_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Viewer,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl ActiveModelBehavior for ActiveModel {}
