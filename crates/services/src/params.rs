//! # Listing parameter resolver
//!
//! Normalizes raw query-string values into the canonical shapes the stores
//! consume. Empty values count as absent.

use domains::{DomainError, DomainResult, PageParams, PostId, PostListParams, PostSort, DEFAULT_LIMIT};
use serde::Deserialize;

/// Query parameters exactly as they arrive from the transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListQuery {
    pub limit: Option<String>,
    pub since: Option<String>,
    pub desc: Option<String>,
    pub sort: Option<String>,
}

impl RawListQuery {
    fn get(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Resolves parameters for a thread's post listing. `since` must be a post id.
pub fn resolve_post_listing(raw: &RawListQuery) -> DomainResult<PostListParams> {
    let sort = match RawListQuery::get(&raw.sort) {
        Some(value) => value.parse::<PostSort>()?,
        None => PostSort::Flat,
    };
    let since = match RawListQuery::get(&raw.since) {
        Some(value) => parse_post_cursor(value)?,
        None => None,
    };
    Ok(PostListParams {
        limit: parse_limit(RawListQuery::get(&raw.limit))?,
        since,
        desc: parse_desc(RawListQuery::get(&raw.desc))?,
        sort,
    })
}

/// Resolves parameters for thread and user listings. `since` stays opaque.
pub fn resolve_page(raw: &RawListQuery) -> DomainResult<PageParams> {
    Ok(PageParams {
        limit: parse_limit(RawListQuery::get(&raw.limit))?,
        since: RawListQuery::get(&raw.since).map(str::to_owned),
        desc: parse_desc(RawListQuery::get(&raw.desc))?,
    })
}

/// A zero limit falls back to the default; a page is never unbounded.
fn parse_limit(value: Option<&str>) -> DomainResult<u32> {
    let Some(value) = value else {
        return Ok(DEFAULT_LIMIT);
    };
    match value.parse::<u32>() {
        Ok(0) => Ok(DEFAULT_LIMIT),
        Ok(limit) => Ok(limit),
        Err(_) => Err(DomainError::bad_request(format!(
            "limit must be a non-negative integer, got `{value}`"
        ))),
    }
}

fn parse_desc(value: Option<&str>) -> DomainResult<bool> {
    match value {
        None => Ok(false),
        Some("1" | "t" | "T" | "true" | "TRUE" | "True") => Ok(true),
        Some("0" | "f" | "F" | "false" | "FALSE" | "False") => Ok(false),
        Some(other) => Err(DomainError::bad_request(format!(
            "desc must be a boolean, got `{other}`"
        ))),
    }
}

/// `0` means "from the start", like an absent cursor.
fn parse_post_cursor(value: &str) -> DomainResult<Option<PostId>> {
    match value.parse::<PostId>() {
        Ok(0) => Ok(None),
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(DomainError::bad_request(format!(
            "since must be a post id, got `{value}`"
        ))),
    }
}
