use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, DomainResult, Thread, ThreadId, ThreadRepository, Vote};

use super::{db_err, PgStore, ThreadRow, THREAD_COLUMNS};

#[async_trait]
impl ThreadRepository for PgStore {
    async fn create_thread(&self, thread: &Thread) -> DomainResult<Thread> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "INSERT INTO threads (title, author, forum, message, slug, created) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {THREAD_COLUMNS}"
        );
        let created: Thread = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(&thread.title)
            .bind(&thread.author)
            .bind(&thread.forum)
            .bind(&thread.message)
            .bind(thread.slug.as_deref())
            .bind(thread.created)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?
            .into();

        sqlx::query("UPDATE forums SET threads = threads + 1 WHERE slug = $1")
            .bind(&created.forum)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query(
            "INSERT INTO forum_users (forum, nickname) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(&created.forum)
        .bind(&created.author)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn find_thread_by_id(&self, id: ThreadId) -> DomainResult<Option<Thread>> {
        let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = $1");
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Thread::from))
    }

    async fn find_thread_by_slug(&self, slug: &str) -> DomainResult<Option<Thread>> {
        let sql = format!("SELECT {THREAD_COLUMNS} FROM threads WHERE lower(slug) = lower($1)");
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Thread::from))
    }

    async fn list_forum_threads(
        &self,
        forum: &str,
        since: Option<DateTime<Utc>>,
        desc: bool,
        limit: u32,
    ) -> DomainResult<Vec<Thread>> {
        let (cmp, dir) = if desc { ("<=", "DESC") } else { (">=", "ASC") };
        let sql = format!(
            "SELECT {THREAD_COLUMNS} FROM threads \
             WHERE lower(forum) = lower($1) AND ($2::timestamptz IS NULL OR created {cmp} $2) \
             ORDER BY created {dir}, id {dir} \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(forum)
            .bind(since)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Thread::from).collect())
    }

    async fn update_thread(&self, thread: &Thread) -> DomainResult<Option<Thread>> {
        let sql = format!(
            "UPDATE threads SET title = $2, message = $3 WHERE id = $1 RETURNING {THREAD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(thread.id)
            .bind(&thread.title)
            .bind(&thread.message)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Thread::from))
    }

    async fn upsert_vote(&self, thread: ThreadId, vote: &Vote) -> DomainResult<Thread> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO votes (thread, nickname, voice) VALUES ($1, $2, $3) \
             ON CONFLICT (thread, nickname) DO UPDATE SET voice = EXCLUDED.voice",
        )
        .bind(thread)
        .bind(&vote.nickname)
        .bind(vote.voice)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let sql = format!(
            "UPDATE threads \
             SET votes = (SELECT COALESCE(SUM(voice), 0) FROM votes WHERE thread = $1) \
             WHERE id = $1 RETURNING {THREAD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(thread)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("thread", thread))?;

        tx.commit().await.map_err(db_err)?;
        Ok(row.into())
    }
}
