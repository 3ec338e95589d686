//! crates/services/src/lib.rs
//!
//! Use cases of the forum, written against the `domains` ports only.

pub mod forums;
pub mod params;
pub mod posts;
pub mod status;
pub mod threads;
pub mod users;

use std::sync::Arc;

use domains::{ForumRepository, PostStore, StatusRepository, ThreadRepository, UserRepository};

pub use forums::ForumService;
pub use params::{resolve_page, resolve_post_listing, RawListQuery};
pub use posts::PostTree;
pub use status::StatusService;
pub use threads::ThreadService;
pub use users::UserService;

/// Every service, wired to one backing store.
pub struct Services {
    pub users: UserService,
    pub forums: ForumService,
    pub threads: ThreadService,
    pub posts: PostTree,
    pub status: StatusService,
}

impl Services {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ForumRepository
            + ThreadRepository
            + PostStore
            + StatusRepository
            + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let forums: Arc<dyn ForumRepository> = store.clone();
        let threads: Arc<dyn ThreadRepository> = store.clone();
        let posts: Arc<dyn PostStore> = store.clone();
        let status: Arc<dyn StatusRepository> = store;

        Self {
            users: UserService::new(users.clone()),
            forums: ForumService::new(forums.clone(), users.clone(), threads.clone()),
            threads: ThreadService::new(threads.clone(), forums.clone(), users.clone()),
            posts: PostTree::new(posts, users, forums, threads),
            status: StatusService::new(status),
        }
    }
}
