use async_trait::async_trait;
use domains::{DomainResult, ServiceStatus, StatusRepository};

use super::{db_err, PgStore};

#[async_trait]
impl StatusRepository for PgStore {
    async fn status(&self) -> DomainResult<ServiceStatus> {
        let (users, forums, threads, posts): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM forums), \
                    (SELECT COUNT(*) FROM threads), (SELECT COUNT(*) FROM posts)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(ServiceStatus {
            users,
            forums,
            threads,
            posts,
        })
    }

    async fn clear(&self) -> DomainResult<()> {
        sqlx::query(
            "TRUNCATE TABLE votes, forum_users, posts, threads, forums, users RESTART IDENTITY CASCADE",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
