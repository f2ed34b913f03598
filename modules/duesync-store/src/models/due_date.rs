use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A resolved due date owned by exactly one assignment. `date` may be NULL:
/// a placeholder row is still created and pinned so every resolved
/// assignment references exactly one due date.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DueDate {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub date_certain: bool,
    pub time_certain: bool,
    pub confidence: f32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewDueDate<'a> {
    pub assignment_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub date_certain: bool,
    pub time_certain: bool,
    pub confidence: f32,
    pub title: &'a str,
    pub description: &'a str,
    pub url: Option<&'a str>,
}

impl DueDate {
    pub async fn create(new: NewDueDate<'_>, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO due_dates
                (assignment_id, date, date_certain, time_certain, confidence,
                 title, description, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.assignment_id)
        .bind(new.date)
        .bind(new.date_certain)
        .bind(new.time_certain)
        .bind(new.confidence)
        .bind(new.title)
        .bind(new.description)
        .bind(new.url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM due_dates WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn for_assignment(assignment_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM due_dates WHERE assignment_id = $1 ORDER BY created_at DESC",
        )
        .bind(assignment_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
