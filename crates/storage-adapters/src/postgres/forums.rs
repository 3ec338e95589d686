use async_trait::async_trait;
use domains::{DomainResult, Forum, ForumRepository};

use super::{db_err, ForumRow, PgStore, FORUM_COLUMNS};

#[async_trait]
impl ForumRepository for PgStore {
    async fn create_forum(&self, forum: &Forum) -> DomainResult<()> {
        sqlx::query(r#"INSERT INTO forums (slug, title, "user") VALUES ($1, $2, $3)"#)
            .bind(&forum.slug)
            .bind(&forum.title)
            .bind(&forum.user)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_forum(&self, slug: &str) -> DomainResult<Option<Forum>> {
        let sql = format!("SELECT {FORUM_COLUMNS} FROM forums WHERE lower(slug) = lower($1)");
        let row = sqlx::query_as::<_, ForumRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Forum::from))
    }
}
