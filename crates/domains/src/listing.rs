//! Canonical listing parameter shapes consumed by the stores.

use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;
use crate::models::PostId;

/// Page size applied when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 100;

/// Traversal order for a thread's posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PostSort {
    /// Strictly by identifier.
    #[default]
    Flat,
    /// Depth-first pre-order by materialized path.
    Tree,
    /// Paginated by root post; whole subtrees returned together.
    ParentTree,
}

impl PostSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::Flat => "flat",
            PostSort::Tree => "tree",
            PostSort::ParentTree => "parent_tree",
        }
    }
}

impl fmt::Display for PostSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostSort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PostSort::Flat),
            "tree" => Ok(PostSort::Tree),
            "parent_tree" => Ok(PostSort::ParentTree),
            other => Err(DomainError::bad_request(format!("unknown sort `{other}`"))),
        }
    }
}

/// Post listing parameters. `since` is a post id; `None` means "from the start".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostListParams {
    pub limit: u32,
    pub since: Option<PostId>,
    pub desc: bool,
    pub sort: PostSort,
}

impl Default for PostListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            since: None,
            desc: false,
            sort: PostSort::Flat,
        }
    }
}

/// Thread and user listing parameters. `since` is an opaque cursor whose
/// meaning (timestamp, nickname) belongs to the listing that consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u32,
    pub since: Option<String>,
    pub desc: bool,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            since: None,
            desc: false,
        }
    }
}
