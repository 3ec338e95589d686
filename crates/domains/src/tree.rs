//! # Post tree algorithms
//!
//! Pure functions behind batch creation and the three listing orders. Stores
//! that can express these in their own query language (SQL) do so; in-process
//! stores call them directly. Both must agree with what is defined here.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::errors::{DomainError, DomainResult};
use crate::listing::{PostListParams, PostSort};
use crate::models::{NewPost, Post, PostId, ThreadId};

/// A stored post referenced as a parent by a creation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub id: PostId,
    pub thread: ThreadId,
    pub path: Vec<PostId>,
}

/// Distinct author nicknames of a batch, compared case-insensitively, in
/// first-seen order. An empty author rejects the whole batch.
pub fn distinct_authors(drafts: &[NewPost]) -> DomainResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut authors = Vec::new();
    for draft in drafts {
        if draft.author.trim().is_empty() {
            return Err(DomainError::bad_request("post author must not be empty"));
        }
        if seen.insert(draft.author.to_lowercase()) {
            authors.push(draft.author.clone());
        }
    }
    Ok(authors)
}

/// Distinct non-zero parent ids of a batch, ascending.
pub fn distinct_parents(drafts: &[NewPost]) -> Vec<PostId> {
    let mut parents: Vec<PostId> = drafts
        .iter()
        .map(|d| d.parent)
        .filter(|&p| p != 0)
        .collect();
    parents.sort_unstable();
    parents.dedup();
    parents
}

/// Computes the materialized path of every draft in a batch.
///
/// `ids[i]` is the identifier reserved for `drafts[i]`. A parent may be a
/// stored post (`stored`) or another draft of the same batch. Every parent is
/// checked individually: one that is unknown or lives in another thread fails
/// the whole batch with `Conflict`.
pub fn assign_paths(
    thread: ThreadId,
    drafts: &[NewPost],
    ids: &[PostId],
    stored: &[ParentRef],
) -> DomainResult<Vec<Vec<PostId>>> {
    if ids.len() != drafts.len() {
        return Err(DomainError::internal(format!(
            "reserved {} ids for {} posts",
            ids.len(),
            drafts.len()
        )));
    }

    let mut stored_paths: HashMap<PostId, &[PostId]> = HashMap::with_capacity(stored.len());
    for parent in stored {
        if parent.thread != thread {
            return Err(DomainError::conflict(format!(
                "parent post {} belongs to thread {}, not {}",
                parent.id, parent.thread, thread
            )));
        }
        stored_paths.insert(parent.id, parent.path.as_slice());
    }

    let batch_index: HashMap<PostId, usize> =
        ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut paths: Vec<Option<Vec<PostId>>> = vec![None; drafts.len()];
    for start in 0..drafts.len() {
        if paths[start].is_some() {
            continue;
        }

        // Walk up through unresolved batch members until reaching a root,
        // a stored parent, or an already resolved draft.
        let mut chain = vec![start];
        let mut on_chain: HashSet<usize> = HashSet::from([start]);
        let mut base: Vec<PostId> = Vec::new();
        loop {
            let current = *chain.last().unwrap_or(&start);
            let parent = drafts[current].parent;
            if parent == 0 {
                break;
            }
            if let Some(path) = stored_paths.get(&parent) {
                base = path.to_vec();
                break;
            }
            match batch_index.get(&parent) {
                Some(&idx) => {
                    if let Some(path) = &paths[idx] {
                        base = path.clone();
                        break;
                    }
                    if !on_chain.insert(idx) {
                        return Err(DomainError::conflict(format!(
                            "post {parent} is its own ancestor"
                        )));
                    }
                    chain.push(idx);
                }
                None => {
                    return Err(DomainError::conflict(format!(
                        "parent post {parent} not found in thread {thread}"
                    )));
                }
            }
        }

        for &idx in chain.iter().rev() {
            base.push(ids[idx]);
            paths[idx] = Some(base.clone());
        }
    }

    paths
        .into_iter()
        .map(|p| p.ok_or_else(|| DomainError::internal("unresolved post path")))
        .collect()
}

/// Orders a whole thread's posts according to `params`.
pub fn select(posts: Vec<Post>, params: &PostListParams) -> Vec<Post> {
    match params.sort {
        PostSort::Flat => select_flat(posts, params),
        PostSort::Tree => select_tree(posts, params),
        PostSort::ParentTree => select_parent_tree(posts, params),
    }
}

fn directed(ord: Ordering, desc: bool) -> Ordering {
    if desc {
        ord.reverse()
    } else {
        ord
    }
}

fn path_order(a: &Post, b: &Post) -> Ordering {
    a.path.cmp(&b.path).then(a.id.cmp(&b.id))
}

fn select_flat(mut posts: Vec<Post>, params: &PostListParams) -> Vec<Post> {
    if let Some(since) = params.since {
        posts.retain(|p| if params.desc { p.id < since } else { p.id > since });
    }
    posts.sort_by(|a, b| directed(a.id.cmp(&b.id), params.desc));
    posts.truncate(params.limit as usize);
    posts
}

fn select_tree(mut posts: Vec<Post>, params: &PostListParams) -> Vec<Post> {
    if let Some(since) = params.since {
        let Some(anchor) = posts.iter().find(|p| p.id == since).cloned() else {
            return Vec::new();
        };
        posts.retain(|p| {
            let ord = path_order(p, &anchor);
            if params.desc {
                ord == Ordering::Less
            } else {
                ord == Ordering::Greater
            }
        });
    }
    posts.sort_by(|a, b| directed(path_order(a, b), params.desc));
    posts.truncate(params.limit as usize);
    posts
}

fn select_parent_tree(mut posts: Vec<Post>, params: &PostListParams) -> Vec<Post> {
    let since_root = match params.since {
        Some(since) => match posts.iter().find(|p| p.id == since) {
            Some(anchor) => Some(anchor.root_id()),
            None => return Vec::new(),
        },
        None => None,
    };

    let mut roots: Vec<PostId> = posts
        .iter()
        .filter(|p| p.is_root())
        .map(|p| p.id)
        .filter(|&id| match since_root {
            Some(bound) if params.desc => id < bound,
            Some(bound) => id > bound,
            None => true,
        })
        .collect();
    roots.sort_unstable_by(|a, b| directed(a.cmp(b), params.desc));
    roots.truncate(params.limit as usize);

    let selected: HashSet<PostId> = roots.iter().copied().collect();
    posts.retain(|p| selected.contains(&p.root_id()));
    posts.sort_by(|a, b| {
        directed(a.root_id().cmp(&b.root_id()), params.desc).then_with(|| path_order(a, b))
    });
    posts
}
