//! Create feed entry table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FeedEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeedEntry::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FeedEntry::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(FeedEntry::PostId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(FeedEntry::PostedByUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeedEntry::PostedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeedEntry::PostSortId)
                            .string_len(32)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feed_entry_viewer")
                            .from(FeedEntry::Table, FeedEntry::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feed_entry_post")
                            .from(FeedEntry::Table, FeedEntry::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, post_id) - the idempotent-upsert key
        manager
            .create_index(
                Index::create()
                    .name("idx_feed_entry_viewer_post")
                    .table(FeedEntry::Table)
                    .col(FeedEntry::UserId)
                    .col(FeedEntry::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, posted_at) - feed reads
        manager
            .create_index(
                Index::create()
                    .name("idx_feed_entry_viewer_posted_at")
                    .table(FeedEntry::Table)
                    .col(FeedEntry::UserId)
                    .col(FeedEntry::PostedAt)
                    .to_owned(),
            )
            .await?;

        // Index: post_id - deletion when a post goes non-live
        manager
            .create_index(
                Index::create()
                    .name("idx_feed_entry_post_id")
                    .table(FeedEntry::Table)
                    .col(FeedEntry::PostId)
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, posted_by_user_id) - deletion on follow revocation
        manager
            .create_index(
                Index::create()
                    .name("idx_feed_entry_viewer_author")
                    .table(FeedEntry::Table)
                    .col(FeedEntry::UserId)
                    .col(FeedEntry::PostedByUserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FeedEntry::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FeedEntry {
    Table,
    Id,
    UserId,
    PostId,
    PostedByUserId,
    PostedAt,
    PostSortId,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
