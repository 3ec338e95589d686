use async_trait::async_trait;
use domains::{DomainResult, PageParams, User, UserRepository};

use super::{db_err, PgStore, UserRow, USER_COLUMNS};

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query("INSERT INTO users (nickname, fullname, about, email) VALUES ($1, $2, $3, $4)")
            .bind(&user.nickname)
            .bind(&user.fullname)
            .bind(&user.about)
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_user(&self, nickname: &str) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(nickname) = lower($1)");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn find_conflicting(&self, nickname: &str, email: &str) -> DomainResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(nickname) = lower($1) OR lower(email) = lower($2) \
             ORDER BY lower(nickname)"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(nickname)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user(&self, user: &User) -> DomainResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET fullname = $2, about = $3, email = $4 \
             WHERE lower(nickname) = lower($1) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.nickname)
            .bind(&user.fullname)
            .bind(&user.about)
            .bind(&user.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn list_forum_users(&self, forum: &str, page: &PageParams) -> DomainResult<Vec<User>> {
        let (cmp, dir) = if page.desc { ("<", "DESC") } else { (">", "ASC") };
        let sql = format!(
            "SELECT u.nickname, u.fullname, u.about, u.email \
             FROM forum_users fu JOIN users u ON u.nickname = fu.nickname \
             WHERE lower(fu.forum) = lower($1) \
               AND ($2::text IS NULL OR lower(u.nickname) COLLATE \"C\" {cmp} lower($2) COLLATE \"C\") \
             ORDER BY lower(u.nickname) COLLATE \"C\" {dir} \
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(forum)
            .bind(page.since.as_deref())
            .bind(i64::from(page.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}
