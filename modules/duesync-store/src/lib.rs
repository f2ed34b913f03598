pub mod blob;
pub mod error;
pub mod models;

pub use blob::{blob_key, BlobStore, BucketStore, MemoryBlobStore};
pub use error::{Result, StoreError};
pub use models::due_date::NewDueDate;
pub use models::{
    Assignment, AuthBundle, Course, DueDate, Enrollment, JobSync, JobSyncGroup, Source, User,
    UserAssignment,
};

use sqlx::PgPool;

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(e.into()))?;
    Ok(())
}
