//! # Post tree service
//!
//! Batch creation with referential checks and the three listing orders,
//! plus the single-post detail and edit operations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domains::tree::{assign_paths, distinct_authors, distinct_parents};
use domains::{
    DomainError, DomainResult, ForumRepository, NewPost, Post, PostDetails, PostId,
    PostListParams, PostPatch, PostSort, PostStore, Related, Thread, ThreadId, ThreadRepository,
    UserRepository,
};
use tracing::{debug, instrument, warn};

pub struct PostTree {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserRepository>,
    forums: Arc<dyn ForumRepository>,
    threads: Arc<dyn ThreadRepository>,
}

impl PostTree {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserRepository>,
        forums: Arc<dyn ForumRepository>,
        threads: Arc<dyn ThreadRepository>,
    ) -> Self {
        Self {
            posts,
            users,
            forums,
            threads,
        }
    }

    /// Creates a batch of posts in `thread`, all or nothing.
    ///
    /// Returned posts keep the input order and carry their assigned id,
    /// path and the batch-wide creation timestamp.
    #[instrument(skip(self, thread, drafts), fields(thread = thread.id, count = drafts.len()))]
    pub async fn create_posts(&self, thread: &Thread, drafts: Vec<NewPost>) -> DomainResult<Vec<Post>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let authors = distinct_authors(&drafts)?;
        let created = Utc::now();

        let mut batch = self.posts.begin_batch().await?;

        let canonical: HashMap<String, String> = batch
            .existing_authors(&authors)
            .await?
            .into_iter()
            .map(|nickname| (nickname.to_lowercase(), nickname))
            .collect();
        if let Some(missing) = authors.iter().find(|a| !canonical.contains_key(&a.to_lowercase())) {
            warn!(author = %missing, "rejecting post batch: unknown author");
            return Err(DomainError::not_found("user", missing));
        }

        let parent_ids = distinct_parents(&drafts);
        let parents = if parent_ids.is_empty() {
            Vec::new()
        } else {
            batch.find_parents(&parent_ids).await?
        };

        let ids = batch.reserve_ids(drafts.len()).await?;
        let paths = assign_paths(thread.id, &drafts, &ids, &parents).inspect_err(|e| {
            warn!(error = %e, "rejecting post batch: invalid parent");
        })?;

        let posts: Vec<Post> = drafts
            .into_iter()
            .zip(ids)
            .zip(paths)
            .map(|((draft, id), path)| Post {
                id,
                parent: draft.parent,
                author: canonical
                    .get(&draft.author.to_lowercase())
                    .cloned()
                    .unwrap_or(draft.author),
                message: draft.message,
                is_edited: false,
                forum: thread.forum.clone(),
                thread: thread.id,
                created,
                path,
            })
            .collect();

        batch.insert(&posts).await?;
        batch.commit().await?;
        debug!(created = posts.len(), "post batch committed");
        Ok(posts)
    }

    /// Lists a thread's posts in the order selected by `params.sort`.
    #[instrument(skip(self))]
    pub async fn list_posts(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>> {
        match params.sort {
            PostSort::Flat => self.posts.list_flat(thread, params).await,
            PostSort::Tree => self.posts.list_tree(thread, params).await,
            PostSort::ParentTree => self.posts.list_parent_tree(thread, params).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn post_details(&self, id: PostId, related: &[Related]) -> DomainResult<PostDetails> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;

        let mut details = PostDetails {
            post,
            author: None,
            thread: None,
            forum: None,
        };
        for related in related {
            match related {
                Related::User => {
                    details.author = self.users.find_user(&details.post.author).await?;
                }
                Related::Thread => {
                    details.thread = self.threads.find_thread_by_id(details.post.thread).await?;
                }
                Related::Forum => {
                    details.forum = self.forums.find_forum(&details.post.forum).await?;
                }
            }
        }
        if details.author.is_none() && related.contains(&Related::User) {
            warn!(post = id, author = %details.post.author, "post author is missing");
        }
        Ok(details)
    }

    /// Edits a post's message. An empty or unchanged message is a no-op.
    #[instrument(skip(self, patch))]
    pub async fn update_post(&self, id: PostId, patch: PostPatch) -> DomainResult<Post> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))?;

        let message = match patch.message {
            Some(message) if !message.is_empty() && message != post.message => message,
            _ => return Ok(post),
        };
        self.posts
            .update_message(id, &message)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::tree::ParentRef;
    use domains::{
        MockForumRepository, MockPostBatch, MockPostStore, MockThreadRepository,
        MockUserRepository,
    };

    fn thread() -> Thread {
        Thread {
            id: 5,
            title: "T".into(),
            author: "alice".into(),
            forum: "rust".into(),
            message: "body".into(),
            votes: 0,
            slug: None,
            created: Utc::now(),
        }
    }

    fn draft(author: &str, parent: PostId) -> NewPost {
        NewPost {
            author: author.into(),
            message: "hi".into(),
            parent,
        }
    }

    fn stored_post(id: PostId, message: &str) -> Post {
        Post {
            id,
            parent: 0,
            author: "alice".into(),
            message: message.into(),
            is_edited: false,
            forum: "rust".into(),
            thread: 5,
            created: Utc::now(),
            path: vec![id],
        }
    }

    fn tree_with(store: MockPostStore) -> PostTree {
        PostTree::new(
            Arc::new(store),
            Arc::new(MockUserRepository::new()),
            Arc::new(MockForumRepository::new()),
            Arc::new(MockThreadRepository::new()),
        )
    }

    fn store_with_batch(batch: MockPostBatch) -> MockPostStore {
        let mut store = MockPostStore::new();
        store
            .expect_begin_batch()
            .times(1)
            .return_once(move || Ok(Box::new(batch)));
        store
    }

    #[tokio::test]
    async fn root_post_gets_path_of_own_id() {
        let mut batch = MockPostBatch::new();
        batch
            .expect_existing_authors()
            .returning(|_| Ok(vec!["Alice".to_string()]));
        batch.expect_find_parents().never();
        batch.expect_reserve_ids().returning(|n| {
            assert_eq!(n, 1);
            Ok(vec![1])
        });
        batch
            .expect_insert()
            .withf(|posts: &[Post]| posts.len() == 1 && posts[0].path == vec![1])
            .times(1)
            .returning(|_| Ok(()));
        batch.expect_commit().times(1).returning(|| Ok(()));

        let created = tree_with(store_with_batch(batch))
            .create_posts(&thread(), vec![draft("alice", 0)])
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, 1);
        assert_eq!(created[0].path, vec![1]);
        assert_eq!(created[0].author, "Alice", "author takes the canonical casing");
        assert_eq!(created[0].forum, "rust");
        assert_eq!(created[0].thread, 5);
    }

    #[tokio::test]
    async fn reply_extends_parent_path_and_batch_shares_timestamp() {
        let mut batch = MockPostBatch::new();
        batch
            .expect_existing_authors()
            .returning(|_| Ok(vec!["alice".to_string()]));
        // 2 is reserved for the first draft, so only 1 is already stored.
        batch.expect_find_parents().returning(|ids| {
            assert_eq!(ids, &[1, 2]);
            Ok(vec![ParentRef {
                id: 1,
                thread: 5,
                path: vec![1],
            }])
        });
        batch.expect_reserve_ids().returning(|_| Ok(vec![2, 3]));
        batch.expect_insert().returning(|_| Ok(()));
        batch.expect_commit().returning(|| Ok(()));

        let created = tree_with(store_with_batch(batch))
            .create_posts(&thread(), vec![draft("alice", 1), draft("alice", 2)])
            .await
            .unwrap();

        assert_eq!(created[0].path, vec![1, 2]);
        assert_eq!(created[1].path, vec![1, 2, 3], "intra-batch parent resolves");
        assert_eq!(created[0].created, created[1].created);
    }

    #[tokio::test]
    async fn unknown_author_is_not_found_and_nothing_is_inserted() {
        let mut batch = MockPostBatch::new();
        batch
            .expect_existing_authors()
            .returning(|_| Ok(vec!["alice".to_string()]));
        batch.expect_reserve_ids().never();
        batch.expect_insert().never();
        batch.expect_commit().never();

        let err = tree_with(store_with_batch(batch))
            .create_posts(&thread(), vec![draft("alice", 0), draft("ghost", 0)])
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::not_found("user", "ghost"));
    }

    #[tokio::test]
    async fn empty_author_fails_before_touching_the_store() {
        let mut store = MockPostStore::new();
        store.expect_begin_batch().never();

        let err = tree_with(store)
            .create_posts(&thread(), vec![draft("", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
    }

    #[tokio::test]
    async fn parent_from_other_thread_conflicts_without_insert() {
        let mut batch = MockPostBatch::new();
        batch
            .expect_existing_authors()
            .returning(|_| Ok(vec!["alice".to_string()]));
        batch.expect_find_parents().returning(|_| {
            Ok(vec![ParentRef {
                id: 9,
                thread: 2,
                path: vec![9],
            }])
        });
        batch.expect_reserve_ids().returning(|_| Ok(vec![10]));
        batch.expect_insert().never();
        batch.expect_commit().never();

        let err = tree_with(store_with_batch(batch))
            .create_posts(&thread(), vec![draft("alice", 9)])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let mut store = MockPostStore::new();
        store.expect_begin_batch().never();
        let created = tree_with(store).create_posts(&thread(), Vec::new()).await.unwrap();
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn list_dispatches_on_sort() {
        let mut store = MockPostStore::new();
        store.expect_list_flat().never();
        store
            .expect_list_tree()
            .withf(|thread, params| *thread == 5 && params.limit == 3)
            .times(1)
            .returning(|_, _| Ok(vec![stored_post(1, "a")]));
        store.expect_list_parent_tree().never();

        let params = PostListParams {
            limit: 3,
            sort: PostSort::Tree,
            ..PostListParams::default()
        };
        let posts = tree_with(store).list_posts(5, &params).await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_message_is_not_written() {
        let mut store = MockPostStore::new();
        store
            .expect_find_post()
            .returning(|id| Ok(Some(stored_post(id, "same"))));
        store.expect_update_message().never();

        let post = tree_with(store)
            .update_post(
                1,
                PostPatch {
                    message: Some("same".into()),
                },
            )
            .await
            .unwrap();
        assert!(!post.is_edited);
    }

    #[tokio::test]
    async fn changed_message_marks_post_edited() {
        let mut store = MockPostStore::new();
        store
            .expect_find_post()
            .returning(|id| Ok(Some(stored_post(id, "old"))));
        store.expect_update_message().times(1).returning(|id, msg| {
            let mut post = stored_post(id, msg);
            post.is_edited = true;
            Ok(Some(post))
        });

        let post = tree_with(store)
            .update_post(
                1,
                PostPatch {
                    message: Some("new".into()),
                },
            )
            .await
            .unwrap();
        assert!(post.is_edited);
        assert_eq!(post.message, "new");
    }

    #[tokio::test]
    async fn details_of_missing_post_is_not_found() {
        let mut store = MockPostStore::new();
        store.expect_find_post().returning(|_| Ok(None));
        let err = tree_with(store).post_details(77, &[]).await.unwrap_err();
        assert_eq!(err, DomainError::not_found("post", 77));
    }
}
