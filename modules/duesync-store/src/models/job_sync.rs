use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One pipeline invocation for a user. Owns its job syncs and is marked
/// complete after the final stage, regardless of per-stage outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobSyncGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSyncGroup {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM job_sync_groups WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    /// Create the group and one job sync per `(course, source)` pair in a
    /// single transaction.
    pub async fn create_with_jobs(
        user_id: Uuid,
        pairs: &[(Uuid, Uuid)],
        pool: &PgPool,
    ) -> Result<(Self, Vec<JobSync>)> {
        let mut tx = pool.begin().await?;

        let group = sqlx::query_as::<_, Self>(
            "INSERT INTO job_sync_groups (user_id) VALUES ($1) RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut jobs = Vec::with_capacity(pairs.len());
        for (course_id, source_id) in pairs {
            let job = sqlx::query_as::<_, JobSync>(
                r#"
                INSERT INTO job_syncs (group_id, course_id, source_id)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(group.id)
            .bind(course_id)
            .bind(source_id)
            .fetch_one(&mut *tx)
            .await?;
            jobs.push(job);
        }

        tx.commit().await?;
        Ok((group, jobs))
    }

    pub async fn complete(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE job_sync_groups SET completed_at = NOW() WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// One `(course, source)` unit within a group. Owns its page tree and the
/// HTML blobs stored under its id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobSync {
    pub id: Uuid,
    pub group_id: Uuid,
    pub course_id: Uuid,
    pub source_id: Uuid,
    pub page_tree: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl JobSync {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM job_syncs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_optional(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM job_syncs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn set_page_tree(id: Uuid, tree: &serde_json::Value, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE job_syncs SET page_tree = $1 WHERE id = $2")
            .bind(tree)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Most recent page tree from a previous sync of the same course,
    /// excluding the current job sync. Drives change detection.
    pub async fn previous_tree(
        course_id: Uuid,
        current_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query_scalar::<_, Option<serde_json::Value>>(
            r#"
            SELECT page_tree FROM job_syncs
            WHERE course_id = $1
              AND id <> $2
              AND page_tree IS NOT NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(current_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.flatten())
    }
}
