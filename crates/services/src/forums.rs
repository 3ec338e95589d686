use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::{
    Creation, DomainError, DomainResult, Forum, ForumRepository, NewForum, PageParams, Thread,
    ThreadRepository, User, UserRepository,
};
use tracing::{debug, info, instrument};

pub struct ForumService {
    forums: Arc<dyn ForumRepository>,
    users: Arc<dyn UserRepository>,
    threads: Arc<dyn ThreadRepository>,
}

impl ForumService {
    pub fn new(
        forums: Arc<dyn ForumRepository>,
        users: Arc<dyn UserRepository>,
        threads: Arc<dyn ThreadRepository>,
    ) -> Self {
        Self {
            forums,
            users,
            threads,
        }
    }

    /// Creates a forum owned by an existing user. A taken slug yields the
    /// forum that already holds it.
    #[instrument(skip(self, draft), fields(slug = %draft.slug))]
    pub async fn create(&self, draft: NewForum) -> DomainResult<Creation<Forum>> {
        let owner = self
            .users
            .find_user(&draft.user)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &draft.user))?;

        if let Some(existing) = self.forums.find_forum(&draft.slug).await? {
            return Ok(Creation::AlreadyExists(existing));
        }

        let forum = Forum {
            slug: draft.slug,
            title: draft.title,
            user: owner.nickname,
            posts: 0,
            threads: 0,
        };
        match self.forums.create_forum(&forum).await {
            Ok(()) => {
                info!(owner = %forum.user, "forum created");
                Ok(Creation::Created(forum))
            }
            Err(DomainError::Conflict(msg)) => match self.forums.find_forum(&forum.slug).await? {
                Some(existing) => Ok(Creation::AlreadyExists(existing)),
                None => Err(DomainError::Conflict(msg)),
            },
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn details(&self, slug: &str) -> DomainResult<Forum> {
        self.forums
            .find_forum(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", slug))
    }

    /// Threads of a forum by creation time. `since` is an RFC 3339 timestamp.
    #[instrument(skip(self))]
    pub async fn list_threads(&self, slug: &str, page: &PageParams) -> DomainResult<Vec<Thread>> {
        let forum = self.details(slug).await?;
        let since = page.since.as_deref().map(parse_timestamp).transpose()?;
        debug!(?since, limit = page.limit, desc = page.desc, "listing forum threads");
        self.threads
            .list_forum_threads(&forum.slug, since, page.desc, page.limit)
            .await
    }

    /// Users active in a forum. `since` is a nickname.
    #[instrument(skip(self))]
    pub async fn list_users(&self, slug: &str, page: &PageParams) -> DomainResult<Vec<User>> {
        let forum = self.details(slug).await?;
        self.users.list_forum_users(&forum.slug, page).await
    }
}

fn parse_timestamp(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| DomainError::bad_request(format!("since must be an RFC 3339 timestamp, got `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockForumRepository, MockThreadRepository, MockUserRepository};

    fn owner() -> User {
        User {
            nickname: "Alice".into(),
            fullname: "Alice A".into(),
            about: String::new(),
            email: "a@x.org".into(),
        }
    }

    fn forum() -> Forum {
        Forum {
            slug: "rust".into(),
            title: "Rust".into(),
            user: "Alice".into(),
            posts: 3,
            threads: 1,
        }
    }

    fn service(
        forums: MockForumRepository,
        users: MockUserRepository,
        threads: MockThreadRepository,
    ) -> ForumService {
        ForumService::new(Arc::new(forums), Arc::new(users), Arc::new(threads))
    }

    fn draft() -> NewForum {
        NewForum {
            slug: "rust".into(),
            title: "Rust".into(),
            user: "alice".into(),
        }
    }

    #[tokio::test]
    async fn create_stores_canonical_owner() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| Ok(Some(owner())));
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(None));
        forums
            .expect_create_forum()
            .withf(|f| f.user == "Alice")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = service(forums, users, MockThreadRepository::new())
            .create(draft())
            .await
            .unwrap();
        match outcome {
            Creation::Created(f) => assert_eq!(f.user, "Alice"),
            other => panic!("expected creation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn taken_slug_returns_existing_forum() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| Ok(Some(owner())));
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(Some(forum())));
        forums.expect_create_forum().never();

        let outcome = service(forums, users, MockThreadRepository::new())
            .create(draft())
            .await
            .unwrap();
        assert_eq!(outcome, Creation::AlreadyExists(forum()));
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| Ok(None));
        let mut forums = MockForumRepository::new();
        forums.expect_create_forum().never();

        let err = service(forums, users, MockThreadRepository::new())
            .create(draft())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("user", "alice"));
    }

    #[tokio::test]
    async fn thread_listing_parses_since_timestamp() {
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(Some(forum())));
        let mut threads = MockThreadRepository::new();
        threads
            .expect_list_forum_threads()
            .withf(|slug, since, desc, limit| {
                slug == "rust" && since.is_some() && *desc && *limit == 10
            })
            .times(1)
            .returning(|_, _, _, _| Ok(Vec::new()));

        let page = PageParams {
            limit: 10,
            since: Some("2024-03-01T12:00:00+03:00".into()),
            desc: true,
        };
        let listed = service(forums, MockUserRepository::new(), threads)
            .list_threads("RUST", &page)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn thread_listing_rejects_bad_since() {
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(Some(forum())));
        let mut threads = MockThreadRepository::new();
        threads.expect_list_forum_threads().never();

        let page = PageParams {
            since: Some("yesterday".into()),
            ..PageParams::default()
        };
        let err = service(forums, MockUserRepository::new(), threads)
            .list_threads("rust", &page)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::BadRequest(_)));
    }

    #[tokio::test]
    async fn user_listing_of_missing_forum_is_not_found() {
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(None));
        let mut users = MockUserRepository::new();
        users.expect_list_forum_users().never();

        let err = service(forums, users, MockThreadRepository::new())
            .list_users("nope", &PageParams::default())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::not_found("forum", "nope"));
    }
}
