//! End-to-end feed behavior: follow-graph, content, privacy, and block
//! mutations against the materialized per-viewer feed.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use feedline_common::{config::FeedConfig, AppError};
use feedline_core::{
    AddPostInput, BlockerStatus, BlockingService, FeedService, FollowedStatus, FollowerService,
    PostService, UserService, Visibility, VisibilityService,
};
use feedline_db::{
    entities::{
        follower::FollowStatus,
        user::{self, PrivacyStatus},
    },
    repositories::{
        BlockingRepository, FeedRepository, FollowerRepository, PostRepository, UserRepository,
    },
    test_utils::memory_db,
};
use sea_orm::Set;

struct Engine {
    users: UserService,
    followers: FollowerService,
    blocking: BlockingService,
    posts: PostService,
    feed: FeedService,
    visibility: VisibilityService,
}

async fn engine() -> Engine {
    let db = Arc::new(memory_db().await.unwrap());

    let user_repo = UserRepository::new(db.clone());
    let follower_repo = FollowerRepository::new(db.clone());
    let blocking_repo = BlockingRepository::new(db.clone());
    let post_repo = PostRepository::new(db.clone());
    let feed_repo = FeedRepository::new(db);

    let visibility = VisibilityService::new(
        user_repo.clone(),
        follower_repo.clone(),
        blocking_repo.clone(),
    );
    let feed = FeedService::new(
        feed_repo,
        post_repo.clone(),
        follower_repo.clone(),
        visibility.clone(),
        FeedConfig::default(),
    );
    let followers = FollowerService::new(
        follower_repo,
        user_repo.clone(),
        blocking_repo.clone(),
        feed.clone(),
    );
    let blocking = BlockingService::new(blocking_repo, followers.clone());
    let users = UserService::new(user_repo.clone(), followers.clone());
    let posts = PostService::new(post_repo, user_repo, feed.clone());

    Engine {
        users,
        followers,
        blocking,
        posts,
        feed,
        visibility,
    }
}

fn post_input(post_id: &str, text: &str) -> AddPostInput {
    AddPostInput {
        post_id: post_id.to_string(),
        text: Some(text.to_string()),
        image_url: Some(format!("https://img.example/{post_id}.jpg")),
        lifetime: None,
    }
}

async fn feed_post_ids(engine: &Engine, user_id: &str) -> Vec<String> {
    engine
        .feed
        .get_feed(user_id, user_id, None)
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|item| item.post_id)
        .collect()
}

#[tokio::test]
async fn followed_user_adds_and_archives_posts() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    let status = engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(status, FollowStatus::Following);

    // Feed starts empty
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // They add two posts; both show up in our feed, newest first
    engine
        .posts
        .add_post(&them.id, post_input("p1", "Im sorry dave"))
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p2", "Im afraid I cant do that"))
        .await
        .unwrap();

    let items = engine.feed.get_feed(&us.id, &us.id, None).await.unwrap().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].post_id, "p2");
    assert_eq!(items[0].text.as_deref(), Some("Im afraid I cant do that"));
    assert!(items[0].image_url.is_some());
    assert_eq!(items[1].post_id, "p1");
    assert_eq!(items[1].text.as_deref(), Some("Im sorry dave"));

    // Archiving a post removes it from our feed
    let archived = engine.posts.archive_post(&them.id, "p1").await.unwrap();
    assert!(!archived.post_status.is_live());
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2"]);
}

#[tokio::test]
async fn follow_then_unfollow_restores_prefollow_feed() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    // They post before we follow
    engine
        .posts
        .add_post(&them.id, post_input("p1", "first"))
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p2", "second"))
        .await
        .unwrap();
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // Following fans their existing posts in
    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2", "p1"]);

    // Unfollowing drains them again
    let status = engine.followers.unfollow(&us.id, &them.id).await.unwrap();
    assert_eq!(status, FollowStatus::NotFollowing);
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());
}

#[tokio::test]
async fn private_owner_accept_then_deny() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine
        .users
        .set_privacy_status(&them.id, PrivacyStatus::Private)
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p1", "first"))
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p2", "second"))
        .await
        .unwrap();

    // Requesting does not touch the feed
    let status = engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(status, FollowStatus::Requested);
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // Accepting fans their live posts in
    let status = engine.followers.accept_follower(&them.id, &us.id).await.unwrap();
    assert_eq!(status, FollowStatus::Following);
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2", "p1"]);

    // The owner changes their mind: denying an accepted follower drains the feed
    let status = engine.followers.deny_follower(&them.id, &us.id).await.unwrap();
    assert_eq!(status, FollowStatus::Denied);
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());
}

#[tokio::test]
async fn going_public_releases_pending_requests() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine
        .users
        .set_privacy_status(&them.id, PrivacyStatus::Private)
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p1", "first"))
        .await
        .unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p2", "second"))
        .await
        .unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // Going public auto-accepts the pending request; no new follow call needed
    engine
        .users
        .set_privacy_status(&them.id, PrivacyStatus::Public)
        .await
        .unwrap();

    assert_eq!(
        engine.followers.status_of(&us.id, &them.id).await.unwrap(),
        FollowStatus::Following
    );
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2", "p1"]);
}

#[tokio::test]
async fn expired_post_leaves_all_feeds() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();

    let input = AddPostInput {
        lifetime: Some(Duration::milliseconds(1)),
        ..post_input("p1", "ephemeral")
    };
    engine.posts.add_post(&them.id, input).await.unwrap();

    // The scheduler has not fired yet, so the post is still visible
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p1"]);
    assert_eq!(feed_post_ids(&engine, &them.id).await, vec!["p1"]);

    let expired = engine
        .posts
        .expire_due_posts(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(expired, 1);

    assert!(feed_post_ids(&engine, &us.id).await.is_empty());
    assert!(feed_post_ids(&engine, &them.id).await.is_empty());

    // Replayed expiry events are absorbed
    assert!(engine.posts.expire_post("p1").await.unwrap().is_none());
    assert!(engine.posts.expire_post("no-such-post").await.unwrap().is_none());
}

#[tokio::test]
async fn feed_is_private_to_its_owner() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    // We can read our own feed
    assert!(engine.feed.get_feed(&us.id, &us.id, None).await.unwrap().is_some());

    // They cannot read ours, regardless of follow or privacy state
    assert!(engine.feed.get_feed(&them.id, &us.id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn feed_items_carry_author_relationship_statuses() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p1", "hello"))
        .await
        .unwrap();

    // In our feed: the author is someone we follow and who is not blocking us
    let items = engine.feed.get_feed(&us.id, &us.id, None).await.unwrap().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].posted_by.user_id, them.id);
    assert_eq!(items[0].posted_by.blocker_status, BlockerStatus::NotBlocking);
    assert_eq!(items[0].posted_by.followed_status, FollowedStatus::Following);

    // In their own feed: own posts surface with SELF statuses
    let items = engine
        .feed
        .get_feed(&them.id, &them.id, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].posted_by.user_id, them.id);
    assert_eq!(items[0].posted_by.blocker_status, BlockerStatus::SelfUser);
    assert_eq!(items[0].posted_by.followed_status, FollowedStatus::SelfUser);
}

#[tokio::test]
async fn feed_orders_across_authors_newest_first() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let a = engine.users.create_user("bob").await.unwrap();
    let b = engine.users.create_user("carol").await.unwrap();

    engine.followers.request_follow(&us.id, &a.id).await.unwrap();
    engine.followers.request_follow(&us.id, &b.id).await.unwrap();

    engine.posts.add_post(&a.id, post_input("p1", "one")).await.unwrap();
    engine.posts.add_post(&b.id, post_input("p2", "two")).await.unwrap();
    engine.posts.add_post(&a.id, post_input("p3", "three")).await.unwrap();

    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p3", "p2", "p1"]);
}

#[tokio::test]
async fn duplicate_event_application_is_absorbed() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine
        .posts
        .add_post(&them.id, post_input("p1", "hello"))
        .await
        .unwrap();
    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p1"]);

    // Replaying the grant inserts nothing new
    engine.feed.handle_follow_granted(&us.id, &them.id).await.unwrap();
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p1"]);

    // Replaying a removal deletes nothing that is not there
    engine.feed.handle_post_removed("p1").await.unwrap();
    engine.feed.handle_post_removed("p1").await.unwrap();
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // Replaying a revocation is a no-op as well
    engine.feed.handle_follow_revoked(&us.id, &them.id).await.unwrap();
}

#[tokio::test]
async fn follow_state_transition_errors() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    // Self-follow is rejected
    let result = engine.followers.request_follow(&us.id, &us.id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Double-follow conflicts
    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    let result = engine.followers.request_follow(&us.id, &them.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Accept/deny without a pending request fails
    let result = engine.followers.accept_follower(&us.id, &them.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let result = engine.followers.deny_follower(&us.id, &them.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    // Unfollow of a nonexistent edge is an idempotent no-op
    let status = engine.followers.unfollow(&them.id, &us.id).await.unwrap();
    assert_eq!(status, FollowStatus::NotFollowing);
}

#[tokio::test]
async fn requested_edge_is_idempotent_and_deniable_after_rerequest() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine
        .users
        .set_privacy_status(&them.id, PrivacyStatus::Private)
        .await
        .unwrap();

    // Re-requesting while pending is a no-op, not an error
    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    let status = engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(status, FollowStatus::Requested);

    // Denied edges may be re-requested
    engine.followers.deny_follower(&them.id, &us.id).await.unwrap();
    assert_eq!(
        engine.followers.status_of(&us.id, &them.id).await.unwrap(),
        FollowStatus::Denied
    );
    let status = engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(status, FollowStatus::Requested);
}

#[tokio::test]
async fn blocking_purges_feeds_and_severs_edges() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    engine.followers.request_follow(&them.id, &us.id).await.unwrap();
    engine
        .posts
        .add_post(&them.id, post_input("p1", "theirs"))
        .await
        .unwrap();
    engine.posts.add_post(&us.id, post_input("p2", "ours")).await.unwrap();

    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2", "p1"]);

    engine.blocking.block(&us.id, &them.id).await.unwrap();

    // Both directions drained of the other's posts, both edges severed
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p2"]);
    assert_eq!(feed_post_ids(&engine, &them.id).await, vec!["p1"]);
    assert_eq!(
        engine.followers.status_of(&us.id, &them.id).await.unwrap(),
        FollowStatus::NotFollowing
    );
    assert_eq!(
        engine.followers.status_of(&them.id, &us.id).await.unwrap(),
        FollowStatus::NotFollowing
    );

    // Visibility resolves hidden both ways, and a re-follow is forbidden
    assert_eq!(
        engine.visibility.resolve(&us.id, &them.id).await.unwrap(),
        Visibility::Hidden
    );
    assert_eq!(
        engine.visibility.resolve(&them.id, &us.id).await.unwrap(),
        Visibility::Hidden
    );
    let result = engine.followers.request_follow(&them.id, &us.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn unblock_lifts_the_block_but_restores_nothing() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    engine.posts.add_post(&them.id, post_input("p1", "theirs")).await.unwrap();
    engine.blocking.block(&us.id, &them.id).await.unwrap();

    // Unblocking twice fails the second time
    engine.blocking.unblock(&us.id, &them.id).await.unwrap();
    let result = engine.blocking.unblock(&us.id, &them.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    // The severed edge and drained feed stay as they are
    assert_eq!(
        engine.followers.status_of(&us.id, &them.id).await.unwrap(),
        FollowStatus::NotFollowing
    );
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());

    // Following again works and re-materializes the feed
    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    assert_eq!(feed_post_ids(&engine, &us.id).await, vec!["p1"]);
}

#[tokio::test]
async fn visibility_resolution_matrix() {
    let engine = engine().await;
    let viewer = engine.users.create_user("alice").await.unwrap();
    let owner = engine.users.create_user("bob").await.unwrap();

    // Public owner is visible to strangers
    assert_eq!(
        engine.visibility.resolve(&viewer.id, &owner.id).await.unwrap(),
        Visibility::Visible
    );
    assert_eq!(
        engine.visibility.resolve(&owner.id, &owner.id).await.unwrap(),
        Visibility::SelfView
    );

    // Private owner is hidden from strangers and requesters
    engine
        .users
        .set_privacy_status(&owner.id, PrivacyStatus::Private)
        .await
        .unwrap();
    assert_eq!(
        engine.visibility.resolve(&viewer.id, &owner.id).await.unwrap(),
        Visibility::Hidden
    );
    engine.followers.request_follow(&viewer.id, &owner.id).await.unwrap();
    assert_eq!(
        engine.visibility.resolve(&viewer.id, &owner.id).await.unwrap(),
        Visibility::Hidden
    );

    // ...but visible to an accepted follower
    engine.followers.accept_follower(&owner.id, &viewer.id).await.unwrap();
    assert_eq!(
        engine.visibility.resolve(&viewer.id, &owner.id).await.unwrap(),
        Visibility::Visible
    );
}

#[tokio::test]
async fn follow_transitions_maintain_counts() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine
        .users
        .set_privacy_status(&them.id, PrivacyStatus::Private)
        .await
        .unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    let owner = engine.users.get_user(&them.id).await.unwrap();
    assert_eq!(owner.followers_requested_count, 1);
    assert_eq!(owner.followers_count, 0);

    engine.followers.accept_follower(&them.id, &us.id).await.unwrap();
    let owner = engine.users.get_user(&them.id).await.unwrap();
    assert_eq!(owner.followers_requested_count, 0);
    assert_eq!(owner.followers_count, 1);
    let viewer = engine.users.get_user(&us.id).await.unwrap();
    assert_eq!(viewer.following_count, 1);

    engine.followers.unfollow(&us.id, &them.id).await.unwrap();
    let owner = engine.users.get_user(&them.id).await.unwrap();
    assert_eq!(owner.followers_count, 0);
    let viewer = engine.users.get_user(&us.id).await.unwrap();
    assert_eq!(viewer.following_count, 0);
}

#[tokio::test]
async fn racing_unfollows_apply_side_effects_once() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.followers.request_follow(&us.id, &them.id).await.unwrap();
    engine.posts.add_post(&them.id, post_input("p1", "hello")).await.unwrap();

    // Both calls race on the same active edge; only one may decrement
    let (r1, r2) = tokio::join!(
        engine.followers.unfollow(&us.id, &them.id),
        engine.followers.unfollow(&us.id, &them.id),
    );
    assert_eq!(r1.unwrap(), FollowStatus::NotFollowing);
    assert_eq!(r2.unwrap(), FollowStatus::NotFollowing);

    let owner = engine.users.get_user(&them.id).await.unwrap();
    assert_eq!(owner.followers_count, 0);
    let viewer = engine.users.get_user(&us.id).await.unwrap();
    assert_eq!(viewer.following_count, 0);
    assert!(feed_post_ids(&engine, &us.id).await.is_empty());
}

#[tokio::test]
async fn count_decrements_floor_at_zero() {
    let db = Arc::new(memory_db().await.unwrap());
    let repo = UserRepository::new(db);

    let model = user::ActiveModel {
        id: Set("u1".to_string()),
        username: Set("alice".to_string()),
        username_lower: Set("alice".to_string()),
        privacy_status: Set(PrivacyStatus::Public),
        followers_count: Set(0),
        following_count: Set(0),
        followers_requested_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };
    repo.create(model).await.unwrap();

    repo.decrement_followers_count("u1").await.unwrap();
    repo.decrement_following_count("u1").await.unwrap();
    repo.decrement_followers_requested_count("u1").await.unwrap();

    let found = repo.get_by_id("u1").await.unwrap();
    assert_eq!(found.followers_count, 0);
    assert_eq!(found.following_count, 0);
    assert_eq!(found.followers_requested_count, 0);

    // A legitimate increment still lands after the floored decrement
    repo.increment_followers_count("u1").await.unwrap();
    assert_eq!(repo.get_by_id("u1").await.unwrap().followers_count, 1);
}

#[tokio::test]
async fn post_lifecycle_errors() {
    let engine = engine().await;
    let us = engine.users.create_user("alice").await.unwrap();
    let them = engine.users.create_user("bob").await.unwrap();

    engine.posts.add_post(&us.id, post_input("p1", "mine")).await.unwrap();

    // Duplicate post IDs conflict
    let result = engine.posts.add_post(&us.id, post_input("p1", "again")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    // Unknown owner
    let result = engine.posts.add_post("ghost", post_input("p9", "x")).await;
    assert!(matches!(result, Err(AppError::UserNotFound(_))));

    // Only the owner may archive
    let result = engine.posts.archive_post(&them.id, "p1").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Archiving twice is rejected
    engine.posts.archive_post(&us.id, "p1").await.unwrap();
    let result = engine.posts.archive_post(&us.id, "p1").await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Nonexistent post
    let result = engine.posts.archive_post(&us.id, "nope").await;
    assert!(matches!(result, Err(AppError::PostNotFound(_))));
}

#[tokio::test]
async fn new_post_skips_pending_and_denied_edges() {
    let engine = engine().await;
    let requester = engine.users.create_user("alice").await.unwrap();
    let denied = engine.users.create_user("carol").await.unwrap();
    let owner = engine.users.create_user("bob").await.unwrap();

    engine
        .users
        .set_privacy_status(&owner.id, PrivacyStatus::Private)
        .await
        .unwrap();
    engine
        .followers
        .request_follow(&requester.id, &owner.id)
        .await
        .unwrap();
    engine.followers.request_follow(&denied.id, &owner.id).await.unwrap();
    engine.followers.deny_follower(&owner.id, &denied.id).await.unwrap();

    engine.posts.add_post(&owner.id, post_input("p1", "secret")).await.unwrap();

    assert!(feed_post_ids(&engine, &requester.id).await.is_empty());
    assert!(feed_post_ids(&engine, &denied.id).await.is_empty());
    assert_eq!(feed_post_ids(&engine, &owner.id).await, vec!["p1"]);
}
