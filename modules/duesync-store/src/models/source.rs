use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub course_id: Uuid,
    pub url: String,
    pub requires_auth: bool,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(
        course_id: Uuid,
        url: &str,
        requires_auth: bool,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO sources (course_id, url, requires_auth)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(url)
        .bind(requires_auth)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// All sources of a user's enrolled courses in one round-trip, optionally
    /// restricted to a course subset. One job sync is created per row.
    pub async fn find_for_user(
        user_id: Uuid,
        course_ids: Option<&[Uuid]>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT s.* FROM sources s
            JOIN enrollments e ON e.course_id = s.course_id
            WHERE e.user_id = $1
              AND ($2::uuid[] IS NULL OR s.course_id = ANY($2))
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(course_ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
