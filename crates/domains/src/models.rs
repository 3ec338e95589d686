//! # Domain Models
//!
//! These structs represent the core entities of the forum. Identifiers of
//! threads and posts are store-assigned, monotonically increasing integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ThreadId = i64;
pub type PostId = i64;

/// A registered user. The nickname is the unique, case-insensitive key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    pub fullname: String,
    #[serde(default)]
    pub about: String,
    pub email: String,
}

/// Profile fields supplied when registering; the nickname comes from the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    pub fn into_user(self, nickname: impl Into<String>) -> User {
        User {
            nickname: nickname.into(),
            fullname: self.fullname,
            about: self.about,
            email: self.email,
        }
    }
}

/// Partial profile update. Absent or empty fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub fullname: Option<String>,
    pub about: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    /// Overlays the non-empty fields of the patch onto `user`.
    pub fn apply(self, mut user: User) -> User {
        if let Some(fullname) = self.fullname.filter(|v| !v.is_empty()) {
            user.fullname = fullname;
        }
        if let Some(about) = self.about.filter(|v| !v.is_empty()) {
            user.about = about;
        }
        if let Some(email) = self.email.filter(|v| !v.is_empty()) {
            user.email = email;
        }
        user
    }
}

/// A forum, keyed by its slug. Counters are denormalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub slug: String,
    pub title: String,
    /// Nickname of the owning user.
    pub user: String,
    #[serde(default)]
    pub posts: i64,
    #[serde(default)]
    pub threads: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewForum {
    pub slug: String,
    pub title: String,
    pub user: String,
}

/// A discussion thread. Owns a tree of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub author: String,
    /// Slug of the owning forum.
    pub forum: String,
    pub message: String,
    #[serde(default)]
    pub votes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub created: DateTime<Utc>,
}

/// Thread draft; the forum slug comes from the route.
#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl NewThread {
    /// Empty slugs are treated as absent.
    pub fn normalized_slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub message: Option<String>,
}

impl ThreadPatch {
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().map_or(true, str::is_empty)
            && self.message.as_deref().map_or(true, str::is_empty)
    }

    pub fn apply(self, mut thread: Thread) -> Thread {
        if let Some(title) = self.title.filter(|v| !v.is_empty()) {
            thread.title = title;
        }
        if let Some(message) = self.message.filter(|v| !v.is_empty()) {
            thread.message = message;
        }
        thread
    }
}

/// A single post inside a thread's reply tree.
///
/// `path` holds the ancestor chain from the root post down to this post,
/// with the post's own id last. It is assigned once at creation and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    /// `0` for a root post.
    #[serde(default)]
    pub parent: PostId,
    pub author: String,
    pub message: String,
    #[serde(default)]
    pub is_edited: bool,
    pub forum: String,
    pub thread: ThreadId,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub path: Vec<PostId>,
}

impl Post {
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }

    /// Identifier of the top-level post this one hangs under.
    pub fn root_id(&self) -> PostId {
        self.path.first().copied().unwrap_or(self.id)
    }
}

/// A post draft as submitted in a creation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author: String,
    pub message: String,
    /// `0` means "no parent / top-level".
    #[serde(default)]
    pub parent: PostId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub message: Option<String>,
}

/// Related entities that may be expanded in post details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Related {
    User,
    Forum,
    Thread,
}

impl Related {
    /// Parses a comma-separated `related` list. Unknown tokens are ignored.
    pub fn parse_list(raw: &str) -> Vec<Related> {
        let mut out = Vec::new();
        for token in raw.split(',').map(str::trim) {
            let related = match token {
                "user" => Related::User,
                "forum" => Related::Forum,
                "thread" => Related::Thread,
                _ => continue,
            };
            if !out.contains(&related) {
                out.push(related);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetails {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
}

/// One user's voice on one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub nickname: String,
    pub voice: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "user")]
    pub users: i64,
    #[serde(rename = "forum")]
    pub forums: i64,
    #[serde(rename = "thread")]
    pub threads: i64,
    #[serde(rename = "post")]
    pub posts: i64,
}

/// Result of a create operation that reports clashes instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation<T, E = T> {
    Created(T),
    AlreadyExists(E),
}
