//! Database repositories.

#![allow(missing_docs)]

pub mod blocking;
pub mod feed;
pub mod follower;
pub mod post;
pub mod user;

pub use blocking::BlockingRepository;
pub use feed::FeedRepository;
pub use follower::FollowerRepository;
pub use post::PostRepository;
pub use user::UserRepository;
