//! Database entities.

#![allow(missing_docs)]

pub mod blocking;
pub mod feed_entry;
pub mod follower;
pub mod post;
pub mod user;

pub use blocking::Entity as Blocking;
pub use feed_entry::Entity as FeedEntry;
pub use follower::Entity as Follower;
pub use post::Entity as Post;
pub use user::Entity as User;
