use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use domains::tree::ParentRef;
use domains::{
    DomainError, DomainResult, Post, PostBatch, PostId, PostListParams, PostStore, ThreadId,
};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::{db_err, PgStore, PostRow, POST_COLUMNS};

/// Rows per multi-row INSERT; keeps bind parameters well under the
/// protocol limit of 65535.
const INSERT_CHUNK: usize = 1000;

#[derive(FromRow)]
struct ParentRow {
    id: i64,
    thread: i64,
    path: Vec<i64>,
}

#[async_trait]
impl PostStore for PgStore {
    async fn begin_batch(&self) -> DomainResult<Box<dyn PostBatch>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgBatch { tx: Some(tx) }))
    }

    async fn list_flat(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>> {
        let (cmp, dir) = direction(params.desc);
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE thread = $1 AND ($2::bigint IS NULL OR id {cmp} $2) \
             ORDER BY id {dir} LIMIT $3"
        );
        self.fetch_posts(&sql, thread, params).await
    }

    async fn list_tree(&self, thread: ThreadId, params: &PostListParams) -> DomainResult<Vec<Post>> {
        let (cmp, dir) = direction(params.desc);
        // An anchor outside the thread yields NULL and therefore no rows.
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE thread = $1 \
               AND ($2::bigint IS NULL \
                    OR path {cmp} (SELECT a.path FROM posts a WHERE a.id = $2 AND a.thread = $1)) \
             ORDER BY path {dir}, id {dir} LIMIT $3"
        );
        self.fetch_posts(&sql, thread, params).await
    }

    async fn list_parent_tree(
        &self,
        thread: ThreadId,
        params: &PostListParams,
    ) -> DomainResult<Vec<Post>> {
        let (cmp, dir) = direction(params.desc);
        let sql = format!(
            "WITH roots AS ( \
                 SELECT id FROM posts \
                 WHERE thread = $1 AND parent = 0 \
                   AND ($2::bigint IS NULL \
                        OR id {cmp} (SELECT a.path[1] FROM posts a WHERE a.id = $2 AND a.thread = $1)) \
                 ORDER BY id {dir} LIMIT $3 \
             ) \
             SELECT {POST_COLUMNS} FROM posts \
             WHERE path[1] IN (SELECT id FROM roots) \
             ORDER BY path[1] {dir}, path ASC, id ASC"
        );
        self.fetch_posts(&sql, thread, params).await
    }

    async fn find_post(&self, id: PostId) -> DomainResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Post::from))
    }

    async fn update_message(&self, id: PostId, message: &str) -> DomainResult<Option<Post>> {
        let sql = format!(
            "UPDATE posts SET message = $2, is_edited = TRUE WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(message)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Post::from))
    }
}

impl PgStore {
    async fn fetch_posts(
        &self,
        sql: &str,
        thread: ThreadId,
        params: &PostListParams,
    ) -> DomainResult<Vec<Post>> {
        debug!(thread, sort = %params.sort, since = ?params.since, desc = params.desc, "listing posts");
        let rows = sqlx::query_as::<_, PostRow>(sql)
            .bind(thread)
            .bind(params.since)
            .bind(i64::from(params.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

fn direction(desc: bool) -> (&'static str, &'static str) {
    if desc {
        ("<", "DESC")
    } else {
        (">", "ASC")
    }
}

/// A creation batch running inside one Postgres transaction. Dropping it
/// before [`PostBatch::commit`] rolls the transaction back.
pub struct PgBatch {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgBatch {
    fn tx(&mut self) -> DomainResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DomainError::internal("post batch already committed"))
    }
}

#[async_trait]
impl PostBatch for PgBatch {
    async fn existing_authors(&mut self, nicknames: &[String]) -> DomainResult<Vec<String>> {
        let lowered: Vec<String> = nicknames.iter().map(|n| n.to_lowercase()).collect();
        let tx = self.tx()?;
        sqlx::query_scalar::<_, String>(
            "SELECT nickname FROM users WHERE lower(nickname) = ANY($1)",
        )
        .bind(lowered)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)
    }

    async fn find_parents(&mut self, ids: &[PostId]) -> DomainResult<Vec<ParentRef>> {
        let ids = ids.to_vec();
        let tx = self.tx()?;
        let rows = sqlx::query_as::<_, ParentRow>(
            "SELECT id, thread, path FROM posts WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|r| ParentRef {
                id: r.id,
                thread: r.thread,
                path: r.path,
            })
            .collect())
    }

    async fn reserve_ids(&mut self, count: usize) -> DomainResult<Vec<PostId>> {
        let tx = self.tx()?;
        let mut ids = sqlx::query_scalar::<_, i64>(
            "SELECT nextval(pg_get_serial_sequence('posts', 'id')) FROM generate_series(1, $1::bigint)",
        )
        .bind(count as i64)
        .fetch_all(&mut **tx)
        .await
        .map_err(db_err)?;
        ids.sort_unstable();
        Ok(ids)
    }

    async fn insert(&mut self, posts: &[Post]) -> DomainResult<()> {
        let tx = self.tx()?;
        for chunk in posts.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO posts (id, parent, author, message, is_edited, forum, thread, created, path) ",
            );
            qb.push_values(chunk, |mut row, post| {
                row.push_bind(post.id)
                    .push_bind(post.parent)
                    .push_bind(&post.author)
                    .push_bind(&post.message)
                    .push_bind(post.is_edited)
                    .push_bind(&post.forum)
                    .push_bind(post.thread)
                    .push_bind(post.created)
                    .push_bind(&post.path);
            });
            qb.build().execute(&mut **tx).await.map_err(db_err)?;
        }

        let mut per_forum: BTreeMap<&str, (i64, BTreeSet<&str>)> = BTreeMap::new();
        for post in posts {
            let entry = per_forum.entry(post.forum.as_str()).or_default();
            entry.0 += 1;
            entry.1.insert(post.author.as_str());
        }
        for (forum, (count, authors)) in per_forum {
            sqlx::query("UPDATE forums SET posts = posts + $2 WHERE slug = $1")
                .bind(forum)
                .bind(count)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
            let authors: Vec<String> = authors.into_iter().map(str::to_owned).collect();
            sqlx::query(
                "INSERT INTO forum_users (forum, nickname) \
                 SELECT $1, unnest($2::text[]) ON CONFLICT DO NOTHING",
            )
            .bind(forum)
            .bind(authors)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> DomainResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DomainError::internal("post batch already committed"))?;
        tx.commit().await.map_err(db_err)
    }
}
