//! Community membership lookups

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Clone)]
pub struct CommunitiesRepository {
    pool: Pool<Postgres>,
}

impl CommunitiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Communities the user administers (accepted admin membership only)
    pub async fn administered_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT community_id FROM community_members
            WHERE user_id = $1 AND role = 'admin' AND status = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Admins of a community, who receive notifications on its behalf
    pub async fn admins(&self, community_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM community_members
            WHERE community_id = $1 AND role = 'admin' AND status = 'accepted'
            ORDER BY user_id
            "#,
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
