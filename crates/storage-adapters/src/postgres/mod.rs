//! # PgStore
//!
//! Postgres implementation of the ports, using runtime-checked `sqlx`
//! queries. Case-insensitive keys are compared through `lower()` and backed
//! by functional unique indexes (see `migrations/`).

mod forums;
mod posts;
mod status;
mod threads;
mod users;

use std::time::Duration;

use chrono::{DateTime, Utc};
use domains::{DomainError, Forum, Post, Thread, User};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

pub use posts::PgBatch;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `url`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a driver error onto the domain: uniqueness clashes become
/// `Conflict`, dangling references `NotFound`, everything else `Internal`.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::conflict(db.message().to_owned());
        }
        if db.is_foreign_key_violation() {
            return DomainError::not_found(
                "reference",
                db.constraint().unwrap_or("unknown constraint"),
            );
        }
    }
    tracing::error!(error = %err, "database operation failed");
    DomainError::internal(err.to_string())
}

pub(crate) const USER_COLUMNS: &str = "nickname, fullname, about, email";
pub(crate) const FORUM_COLUMNS: &str = r#"slug, title, "user", posts, threads"#;
pub(crate) const THREAD_COLUMNS: &str = "id, title, author, forum, message, votes, slug, created";
pub(crate) const POST_COLUMNS: &str =
    "id, parent, author, message, is_edited, forum, thread, created, path";

#[derive(FromRow)]
pub(crate) struct UserRow {
    nickname: String,
    fullname: String,
    about: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            nickname: row.nickname,
            fullname: row.fullname,
            about: row.about,
            email: row.email,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct ForumRow {
    slug: String,
    title: String,
    user: String,
    posts: i64,
    threads: i64,
}

impl From<ForumRow> for Forum {
    fn from(row: ForumRow) -> Self {
        Forum {
            slug: row.slug,
            title: row.title,
            user: row.user,
            posts: row.posts,
            threads: row.threads,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct ThreadRow {
    id: i64,
    title: String,
    author: String,
    forum: String,
    message: String,
    votes: i64,
    slug: Option<String>,
    created: DateTime<Utc>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: row.id,
            title: row.title,
            author: row.author,
            forum: row.forum,
            message: row.message,
            votes: row.votes,
            slug: row.slug,
            created: row.created,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct PostRow {
    id: i64,
    parent: i64,
    author: String,
    message: String,
    is_edited: bool,
    forum: String,
    thread: i64,
    created: DateTime<Utc>,
    path: Vec<i64>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            parent: row.parent,
            author: row.author,
            message: row.message,
            is_edited: row.is_edited,
            forum: row.forum,
            thread: row.thread,
            created: row.created,
            path: row.path,
        }
    }
}
