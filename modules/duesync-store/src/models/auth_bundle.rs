use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A user's exported browser session cookies. Read-only during a pipeline
/// run, except that an authentication failure flips `in_sync` off so the
/// user can be asked to re-export.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthBundle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cookie_set: serde_json::Value,
    pub in_sync: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthBundle {
    pub async fn latest_for_user(user_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM auth_bundles
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(
        user_id: Uuid,
        cookie_set: serde_json::Value,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO auth_bundles (user_id, cookie_set)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(cookie_set)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mark_out_of_sync(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE auth_bundles SET in_sync = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
