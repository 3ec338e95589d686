use std::sync::Arc;

use chrono::Utc;
use domains::{
    Creation, DomainError, DomainResult, ForumRepository, NewThread, Thread, ThreadPatch,
    ThreadRepository, UserRepository, Vote,
};
use tracing::{info, instrument};

pub struct ThreadService {
    threads: Arc<dyn ThreadRepository>,
    forums: Arc<dyn ForumRepository>,
    users: Arc<dyn UserRepository>,
}

impl ThreadService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        forums: Arc<dyn ForumRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            threads,
            forums,
            users,
        }
    }

    /// Looks a thread up by id when `slug_or_id` is all digits, by slug otherwise.
    #[instrument(skip(self))]
    pub async fn resolve(&self, slug_or_id: &str) -> DomainResult<Thread> {
        let found = match parse_thread_id(slug_or_id) {
            Some(id) => self.threads.find_thread_by_id(id).await?,
            None => self.threads.find_thread_by_slug(slug_or_id).await?,
        };
        found.ok_or_else(|| DomainError::not_found("thread", slug_or_id))
    }

    /// Opens a thread in `forum`. A taken slug yields the thread holding it.
    #[instrument(skip(self, draft), fields(author = %draft.author))]
    pub async fn create(&self, forum: &str, draft: NewThread) -> DomainResult<Creation<Thread>> {
        let author = self
            .users
            .find_user(&draft.author)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &draft.author))?;
        let forum = self
            .forums
            .find_forum(forum)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", forum))?;

        let slug = draft.normalized_slug().map(str::to_owned);
        if let Some(slug) = &slug {
            if let Some(existing) = self.threads.find_thread_by_slug(slug).await? {
                return Ok(Creation::AlreadyExists(existing));
            }
        }

        let thread = Thread {
            id: 0,
            title: draft.title,
            author: author.nickname,
            forum: forum.slug,
            message: draft.message,
            votes: 0,
            slug,
            created: draft.created.unwrap_or_else(Utc::now),
        };
        match self.threads.create_thread(&thread).await {
            Ok(created) => {
                info!(thread = created.id, forum = %created.forum, "thread created");
                Ok(Creation::Created(created))
            }
            Err(DomainError::Conflict(msg)) => {
                let existing = match &thread.slug {
                    Some(slug) => self.threads.find_thread_by_slug(slug).await?,
                    None => None,
                };
                existing
                    .map(Creation::AlreadyExists)
                    .ok_or(DomainError::Conflict(msg))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, slug_or_id: &str, patch: ThreadPatch) -> DomainResult<Thread> {
        let thread = self.resolve(slug_or_id).await?;
        if patch.is_empty() {
            return Ok(thread);
        }
        let id = thread.id;
        self.threads
            .update_thread(&patch.apply(thread))
            .await?
            .ok_or_else(|| DomainError::not_found("thread", id))
    }

    /// Records `vote`, replacing any earlier voice of the same user.
    #[instrument(skip(self))]
    pub async fn vote(&self, slug_or_id: &str, vote: Vote) -> DomainResult<Thread> {
        if vote.voice != 1 && vote.voice != -1 {
            return Err(DomainError::bad_request(format!(
                "voice must be 1 or -1, got {}",
                vote.voice
            )));
        }
        let voter = self
            .users
            .find_user(&vote.nickname)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &vote.nickname))?;
        let thread = self.resolve(slug_or_id).await?;
        self.threads
            .upsert_vote(
                thread.id,
                &Vote {
                    nickname: voter.nickname,
                    voice: vote.voice,
                },
            )
            .await
    }
}

fn parse_thread_id(slug_or_id: &str) -> Option<i64> {
    if slug_or_id.is_empty() || !slug_or_id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    slug_or_id.parse().ok()
}
