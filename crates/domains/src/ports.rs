//! # Ports
//!
//! Storage contracts the services are written against. Every adapter must
//! implement these traits to be wired into the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::DomainResult;
use crate::listing::{PageParams, PostListParams};
use crate::models::{Forum, Post, PostId, ServiceStatus, Thread, ThreadId, User, Vote};
use crate::tree::ParentRef;

/// User persistence. Nicknames and emails compare case-insensitively.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> DomainResult<()>;
    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>>;
    /// All users whose nickname or email clashes with the given ones.
    async fn find_conflicting(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>>;
    /// Returns `None` when no user has that nickname.
    async fn update_user(&self, user: &User) -> DomainResult<Option<User>>;
    /// Users who created a thread or post in the forum, ordered by nickname.
    /// `page.since` is a nickname, exclusive.
    async fn list_forum_users(&self, forum: &str, page: &PageParams) -> DomainResult<Vec<User>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ForumRepository: Send + Sync {
    async fn create_forum(&self, forum: &Forum) -> DomainResult<()>;
    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Persists a thread (its `id` is ignored and assigned by the store),
    /// bumping the forum's thread counter in the same transaction.
    async fn create_thread(&self, thread: &Thread) -> DomainResult<Thread>;
    async fn find_thread_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>>;
    async fn find_thread_by_slug(&self, slug: &str) -> DomainResult<Option<Thread>>;
    /// Threads of a forum by creation time; `since` is inclusive.
    async fn list_forum_threads(
        &self,
        forum: &str,
        since: Option<DateTime<Utc>>,
        desc: bool,
        limit: u32,
    ) -> DomainResult<Vec<Thread>>;
    async fn update_thread(&self, thread: &Thread) -> DomainResult<Option<Thread>>;
    /// Inserts or replaces the voter's voice and recomputes the tally.
    async fn upsert_vote(&self, thread: ThreadId, vote: &Vote) -> DomainResult<Thread>;
}

/// Owner of the post entity and its materialized path.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Opens an atomic creation batch. Nothing staged in it is observable
    /// until [`PostBatch::commit`]; dropping it uncommitted discards it.
    async fn begin_batch(&self) -> DomainResult<Box<dyn PostBatch>>;

    async fn list_flat(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>>;
    async fn list_tree(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>>;
    async fn list_parent_tree(
        &self,
        thread: ThreadId,
        params: &PostListParams,
    ) -> DomainResult<Vec<Post>>;

    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>>;
    /// Replaces the message and marks the post edited.
    async fn update_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>>;
}

/// One transactional unit of post creation. Reads made through the batch
/// happen-before its insert.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostBatch: Send {
    /// Canonical nicknames of the given authors that exist.
    async fn existing_authors(&mut self, nicknames: &[String]) -> DomainResult<Vec<String>>;
    /// The stored posts among `ids`; absent ones are simply not returned.
    async fn find_parents(&mut self, ids: &[PostId]) -> DomainResult<Vec<ParentRef>>;
    /// Allocates `count` fresh, increasing post identifiers.
    async fn reserve_ids(&mut self, count: usize) -> DomainResult<Vec<PostId>>;
    /// Stages fully built posts and the forum bookkeeping that goes with them.
    async fn insert(&mut self, posts: &[Post]) -> DomainResult<()>;
    async fn commit(&mut self) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn status(&self) -> DomainResult<ServiceStatus>;
    async fn clear(&self) -> DomainResult<()>;
}
