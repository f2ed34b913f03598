use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Per-user overlay on a course assignment: an optional due-date override
/// and a completed flag. `completed_at` is set by the user surface and never
/// cleared by the sync pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assignment_id: Uuid,
    pub chosen_due_date_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserAssignment {
    pub async fn find_for_user(user_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM user_assignments WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn ensure(user_id: Uuid, assignment_id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_assignments (user_id, assignment_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, assignment_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(assignment_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Override the pinned due date for this user only.
    pub async fn set_due_date_override(
        id: Uuid,
        due_date_id: Option<Uuid>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query("UPDATE user_assignments SET chosen_due_date_id = $2 WHERE id = $1")
            .bind(id)
            .bind(due_date_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark complete. Monotonic: a second call keeps the first timestamp.
    pub async fn complete(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE user_assignments SET completed_at = NOW() WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
