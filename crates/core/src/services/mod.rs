//! Business logic services.

#![allow(missing_docs)]

pub mod blocking;
pub mod feed;
pub mod follower;
pub mod post;
pub mod user;
pub mod visibility;

pub use blocking::BlockingService;
pub use feed::{FeedItem, FeedService, PostedBy};
pub use follower::FollowerService;
pub use post::{AddPostInput, PostService};
pub use user::UserService;
pub use visibility::{BlockerStatus, FollowedStatus, Visibility, VisibilityService};
