//! # MemoryStore
//!
//! In-process implementation of every port. All state sits behind one
//! `tokio::sync::RwLock`; a post batch holds the write half from
//! `begin_batch` until it is committed or dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::tree::{self, ParentRef};
use domains::{
    DomainError, DomainResult, Forum, ForumRepository, PageParams, Post, PostBatch, PostId,
    PostListParams, PostSort, PostStore, ServiceStatus, StatusRepository, Thread, ThreadId,
    ThreadRepository, User, UserRepository, Vote,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

#[derive(Debug)]
struct State {
    /// Keyed by lowercased nickname.
    users: BTreeMap<String, User>,
    /// Keyed by lowercased slug.
    forums: HashMap<String, Forum>,
    threads: BTreeMap<ThreadId, Thread>,
    posts: BTreeMap<PostId, Post>,
    /// (thread, lowercased nickname) -> voice
    votes: HashMap<(ThreadId, String), i32>,
    /// lowercased forum slug -> lowercased nicknames
    forum_users: HashMap<String, BTreeSet<String>>,
    next_thread_id: ThreadId,
    next_post_id: PostId,
}

impl Default for State {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            forums: HashMap::new(),
            threads: BTreeMap::new(),
            posts: BTreeMap::new(),
            votes: HashMap::new(),
            forum_users: HashMap::new(),
            next_thread_id: 1,
            next_post_id: 1,
        }
    }
}

impl State {
    fn join_forum(&mut self, forum: &str, nickname: &str) {
        self.forum_users
            .entry(forum.to_lowercase())
            .or_default()
            .insert(nickname.to_lowercase());
    }

    fn thread_posts(&self, thread: ThreadId) -> Vec<Post> {
        self.posts
            .values()
            .filter(|p| p.thread == thread)
            .cloned()
            .collect()
    }

    fn slug_taken(&self, slug: &str) -> bool {
        let slug = slug.to_lowercase();
        self.threads
            .values()
            .filter_map(|t| t.slug.as_deref())
            .any(|s| s.to_lowercase() == slug)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let key = user.nickname.to_lowercase();
        let email = user.email.to_lowercase();
        if state.users.contains_key(&key)
            || state.users.values().any(|u| u.email.to_lowercase() == email)
        {
            return Err(DomainError::conflict(format!(
                "user {} already exists",
                user.nickname
            )));
        }
        state.users.insert(key, user.clone());
        Ok(())
    }

    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&nickname.to_lowercase()).cloned())
    }

    async fn find_conflicting(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>> {
        let state = self.state.read().await;
        let nickname = nickname.to_lowercase();
        let email = email.to_lowercase();
        Ok(state
            .users
            .iter()
            .filter(|(key, u)| **key == nickname || u.email.to_lowercase() == email)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn update_user(&self, user: &User) -> DomainResult<Option<User>> {
        let mut state = self.state.write().await;
        let key = user.nickname.to_lowercase();
        let email = user.email.to_lowercase();
        let taken = state
            .users
            .iter()
            .any(|(k, u)| *k != key && u.email.to_lowercase() == email);
        if taken {
            return Err(DomainError::conflict(format!(
                "email {} is already in use",
                user.email
            )));
        }
        Ok(state.users.get_mut(&key).map(|stored| {
            stored.fullname = user.fullname.clone();
            stored.about = user.about.clone();
            stored.email = user.email.clone();
            stored.clone()
        }))
    }

    async fn list_forum_users(&self, forum: &str, page: &PageParams) -> DomainResult<Vec<User>> {
        let state = self.state.read().await;
        let Some(members) = state.forum_users.get(&forum.to_lowercase()) else {
            return Ok(Vec::new());
        };
        let since = page.since.as_deref().map(str::to_lowercase);
        let in_range = |key: &&String| match &since {
            Some(since) if page.desc => key.as_str() < since.as_str(),
            Some(since) => key.as_str() > since.as_str(),
            None => true,
        };
        let limit = page.limit as usize;
        let keys: Vec<&String> = if page.desc {
            members.iter().rev().filter(in_range).take(limit).collect()
        } else {
            members.iter().filter(in_range).take(limit).collect()
        };
        Ok(keys
            .into_iter()
            .filter_map(|k| state.users.get(k).cloned())
            .collect())
    }
}

#[async_trait]
impl ForumRepository for MemoryStore {
    async fn create_forum(&self, forum: &Forum) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let key = forum.slug.to_lowercase();
        if state.forums.contains_key(&key) {
            return Err(DomainError::conflict(format!("forum {} already exists", forum.slug)));
        }
        state.forums.insert(key, forum.clone());
        Ok(())
    }

    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>> {
        let state = self.state.read().await;
        Ok(state.forums.get(&slug.to_lowercase()).cloned())
    }
}

#[async_trait]
impl ThreadRepository for MemoryStore {
    async fn create_thread(&self, thread: &Thread) -> DomainResult<Thread> {
        let mut state = self.state.write().await;
        if let Some(slug) = &thread.slug {
            if state.slug_taken(slug) {
                return Err(DomainError::conflict(format!("thread {slug} already exists")));
            }
        }
        let forum_key = thread.forum.to_lowercase();
        let Some(forum) = state.forums.get_mut(&forum_key) else {
            return Err(DomainError::not_found("forum", &thread.forum));
        };
        forum.threads += 1;

        let mut stored = thread.clone();
        stored.id = state.next_thread_id;
        state.next_thread_id += 1;
        state.join_forum(&thread.forum, &thread.author);
        state.threads.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_thread_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>> {
        let state = self.state.read().await;
        Ok(state.threads.get(&id).cloned())
    }

    async fn find_thread_by_slug(&self, slug: &str) -> DomainResult<Option<Thread>> {
        let state = self.state.read().await;
        let slug = slug.to_lowercase();
        Ok(state
            .threads
            .values()
            .find(|t| t.slug.as_deref().map(str::to_lowercase).as_deref() == Some(slug.as_str()))
            .cloned())
    }

    async fn list_forum_threads(
        &self,
        forum: &str,
        since: Option<DateTime<Utc>>,
        desc: bool,
        limit: u32,
    ) -> DomainResult<Vec<Thread>> {
        let state = self.state.read().await;
        let forum = forum.to_lowercase();
        let mut threads: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| t.forum.to_lowercase() == forum)
            .filter(|t| match since {
                Some(since) if desc => t.created <= since,
                Some(since) => t.created >= since,
                None => true,
            })
            .cloned()
            .collect();
        threads.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        if desc {
            threads.reverse();
        }
        threads.truncate(limit as usize);
        Ok(threads)
    }

    async fn update_thread(&self, thread: &Thread) -> DomainResult<Option<Thread>> {
        let mut state = self.state.write().await;
        Ok(state.threads.get_mut(&thread.id).map(|stored| {
            stored.title = thread.title.clone();
            stored.message = thread.message.clone();
            stored.clone()
        }))
    }

    async fn upsert_vote(&self, thread: ThreadId, vote: &Vote) -> DomainResult<Thread> {
        let mut state = self.state.write().await;
        if !state.threads.contains_key(&thread) {
            return Err(DomainError::not_found("thread", thread));
        }
        state
            .votes
            .insert((thread, vote.nickname.to_lowercase()), vote.voice);
        let total: i64 = state
            .votes
            .iter()
            .filter(|((t, _), _)| *t == thread)
            .map(|(_, voice)| i64::from(*voice))
            .sum();
        let stored = state
            .threads
            .get_mut(&thread)
            .ok_or_else(|| DomainError::not_found("thread", thread))?;
        stored.votes = total;
        Ok(stored.clone())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn begin_batch(&self) -> DomainResult<Box<dyn PostBatch>> {
        let guard = self.state.clone().write_owned().await;
        Ok(Box::new(MemoryBatch {
            state: Some(guard),
            staged: Vec::new(),
        }))
    }

    async fn list_flat(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>> {
        self.list(thread, params, PostSort::Flat).await
    }

    async fn list_tree(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>> {
        self.list(thread, params, PostSort::Tree).await
    }

    async fn list_parent_tree(
        &self,
        thread: ThreadId,
        params: &PostListParams,
    ) -> DomainResult<Vec<Post>> {
        self.list(thread, params, PostSort::ParentTree).await
    }

    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).cloned())
    }

    async fn update_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(&id).map(|post| {
            post.message = message.to_owned();
            post.is_edited = true;
            post.clone()
        }))
    }
}

impl MemoryStore {
    async fn list(
        &self,
        thread: ThreadId,
        params: &PostListParams,
        sort: PostSort,
    ) -> DomainResult<Vec<Post>> {
        let posts = self.state.read().await.thread_posts(thread);
        Ok(tree::select(posts, &PostListParams { sort, ..*params }))
    }
}

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn status(&self) -> DomainResult<ServiceStatus> {
        let state = self.state.read().await;
        Ok(ServiceStatus {
            users: state.users.len() as i64,
            forums: state.forums.len() as i64,
            threads: state.threads.len() as i64,
            posts: state.posts.len() as i64,
        })
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.state.write().await = State::default();
        Ok(())
    }
}

/// A creation batch over the memory store. Staged posts are applied on
/// commit, which also releases the write lock. Dropping the batch before
/// commit releases the lock and discards them.
pub struct MemoryBatch {
    state: Option<OwnedRwLockWriteGuard<State>>,
    staged: Vec<Post>,
}

impl MemoryBatch {
    fn state(&mut self) -> DomainResult<&mut State> {
        self.state
            .as_deref_mut()
            .ok_or_else(|| DomainError::internal("post batch already committed"))
    }
}

#[async_trait]
impl PostBatch for MemoryBatch {
    async fn existing_authors(&mut self, nicknames: &[String]) -> DomainResult<Vec<String>> {
        let state = self.state()?;
        Ok(nicknames
            .iter()
            .filter_map(|n| state.users.get(&n.to_lowercase()))
            .map(|u| u.nickname.clone())
            .collect())
    }

    async fn find_parents(&mut self, ids: &[PostId]) -> DomainResult<Vec<ParentRef>> {
        let state = self.state()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.posts.get(id))
            .map(|p| ParentRef {
                id: p.id,
                thread: p.thread,
                path: p.path.clone(),
            })
            .collect())
    }

    async fn reserve_ids(&mut self, count: usize) -> DomainResult<Vec<PostId>> {
        let state = self.state()?;
        let first = state.next_post_id;
        state.next_post_id += count as PostId;
        Ok((first..first + count as PostId).collect())
    }

    async fn insert(&mut self, posts: &[Post]) -> DomainResult<()> {
        self.state()?;
        self.staged.extend_from_slice(posts);
        Ok(())
    }

    async fn commit(&mut self) -> DomainResult<()> {
        let mut state = self
            .state
            .take()
            .ok_or_else(|| DomainError::internal("post batch already committed"))?;
        let staged = std::mem::take(&mut self.staged);
        if let Some(orphan) = staged
            .iter()
            .find(|p| !state.forums.contains_key(&p.forum.to_lowercase()))
        {
            return Err(DomainError::not_found("forum", &orphan.forum));
        }
        let count = staged.len();
        for post in staged {
            if let Some(forum) = state.forums.get_mut(&post.forum.to_lowercase()) {
                forum.posts += 1;
            }
            state.join_forum(&post.forum, &post.author);
            state.posts.insert(post.id, post);
        }
        debug!(count, "memory batch committed");
        Ok(())
    }
}
