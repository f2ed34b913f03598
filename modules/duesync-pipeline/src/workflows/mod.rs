//! Restate durable workflow for the sync pipeline.
//!
//! The workflow impl holds `Arc<SyncDeps>` and journals every store or
//! network interaction through `ctx.run`, so a crash-resume replays
//! completed stages from the journal instead of re-executing them.

pub mod course_sync;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use restate_sdk::prelude::*;
use sqlx::PgPool;
use typed_builder::TypedBuilder;

use browser_client::BrowserClient;
use duesync_common::Config;
use duesync_store::{BlobStore, BucketStore};

use crate::extractor::ExtractPolicy;
use crate::oracles::{
    ClaudeDueDateOracle, ClaudeExtractionOracle, ClaudeLinkOracle, DueDateOracle,
    ExtractionOracle, LinkOracle,
};

/// Per-activity timeouts. The overall workflow deadline (2 h) is enforced
/// by the Restate invocation configuration.
pub const CREATE_JOBS_TIMEOUT: Duration = Duration::from_secs(30);
pub const CRAWL_TIMEOUT: Duration = Duration::from_secs(300);
pub const ASSIGNMENTS_TIMEOUT: Duration = Duration::from_secs(180);
pub const DUE_DATES_TIMEOUT: Duration = Duration::from_secs(180);

/// Shared dependency container for the sync workflow. Holds long-lived,
/// cloneable resources; per-invocation resources (browser sessions,
/// crawlers) are constructed from these at stage time.
#[derive(Clone, TypedBuilder)]
pub struct SyncDeps {
    pub pool: PgPool,
    pub blobs: Arc<dyn BlobStore>,
    pub browser: Arc<BrowserClient>,
    pub link_oracle: Arc<dyn LinkOracle>,
    pub extraction_oracle: Arc<dyn ExtractionOracle>,
    pub due_date_oracle: Arc<dyn DueDateOracle>,
    #[builder(default = ExtractPolicy::ChangedPages)]
    pub extract_policy: ExtractPolicy,
}

impl SyncDeps {
    /// Production wiring from the env config.
    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        Self::builder()
            .pool(pool)
            .blobs(Arc::new(BucketStore::new(
                &config.storage_url,
                &config.storage_key,
                &config.blob_bucket,
            )) as Arc<dyn BlobStore>)
            .browser(Arc::new(BrowserClient::new(
                &config.browserless_url,
                config.browserless_token.as_deref(),
            )))
            .link_oracle(Arc::new(ClaudeLinkOracle::new(&config.anthropic_api_key))
                as Arc<dyn LinkOracle>)
            .extraction_oracle(Arc::new(ClaudeExtractionOracle::new(
                &config.anthropic_api_key,
            )) as Arc<dyn ExtractionOracle>)
            .due_date_oracle(Arc::new(ClaudeDueDateOracle::new(&config.anthropic_api_key))
                as Arc<dyn DueDateOracle>)
            .build()
    }
}

/// Read the `"status"` key from Restate workflow state. `"pending"` if unset.
pub async fn read_workflow_status(ctx: &SharedWorkflowContext<'_>) -> Result<String, HandlerError> {
    Ok(ctx
        .get::<String>("status")
        .await?
        .unwrap_or_else(|| "pending".to_string()))
}

/// Implement Restate SDK serialization traits for types that already have
/// serde derives, without the `Json<>` wrapper.
#[macro_export]
macro_rules! impl_restate_serde {
    ($type:ty) => {
        impl restate_sdk::serde::Serialize for $type {
            type Error = serde_json::Error;

            fn serialize(&self) -> Result<bytes::Bytes, Self::Error> {
                serde_json::to_vec(self).map(bytes::Bytes::from)
            }
        }

        impl restate_sdk::serde::Deserialize for $type {
            type Error = serde_json::Error;

            fn deserialize(bytes: &mut bytes::Bytes) -> Result<Self, Self::Error> {
                serde_json::from_slice(bytes)
            }
        }

        impl restate_sdk::serde::PayloadMetadata for $type {}
    };
}
