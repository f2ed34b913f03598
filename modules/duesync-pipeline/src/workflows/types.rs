//! Request/response types for the sync workflow. All implement serde plus
//! the Restate serialization bridge.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Start a sync for one user, optionally restricted to a course subset.
/// `force_refresh` ignores previous trees so every page counts as new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPipelineRequest {
    pub user_id: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub course_ids: Option<Vec<String>>,
}

/// Empty request for `get_status` shared handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyRequest;

// ---------------------------------------------------------------------------
// Journaled step results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedJobsResult {
    pub group_id: String,
    pub job_sync_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStageOutcome {
    pub job_sync_id: String,
    pub success: bool,
    pub pages_total: u32,
    pub pages_new: u32,
    pub pages_changed: u32,
    pub pages_unchanged: u32,
    pub pages_with_assignments: u32,
    pub pages_failed: u32,
    pub error_message: Option<String>,
}

impl CrawlStageOutcome {
    pub fn failed(job_sync_id: &str, message: impl Into<String>) -> Self {
        Self {
            job_sync_id: job_sync_id.to_string(),
            success: false,
            pages_total: 0,
            pages_new: 0,
            pages_changed: 0,
            pages_unchanged: 0,
            pages_with_assignments: 0,
            pages_failed: 0,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentStageOutcome {
    pub job_sync_id: String,
    pub success: bool,
    pub assignments_found: u32,
    pub assignments_created: u32,
    /// Assignments produced or touched by this sync; stage D's input.
    pub touched_assignment_ids: Vec<String>,
    pub error_message: Option<String>,
}

impl AssignmentStageOutcome {
    pub fn failed(job_sync_id: &str, message: impl Into<String>) -> Self {
        Self {
            job_sync_id: job_sync_id.to_string(),
            success: false,
            assignments_found: 0,
            assignments_created: 0,
            touched_assignment_ids: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDateStageOutcome {
    pub job_sync_id: String,
    pub success: bool,
    pub due_dates_found: u32,
    pub due_dates_created: u32,
    pub assignments_updated: u32,
    pub error_message: Option<String>,
}

impl DueDateStageOutcome {
    pub fn failed(job_sync_id: &str, message: impl Into<String>) -> Self {
        Self {
            job_sync_id: job_sync_id.to_string(),
            success: false,
            due_dates_found: 0,
            due_dates_created: 0,
            assignments_updated: 0,
            error_message: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPipelineResult {
    pub group_id: String,
    pub job_sync_ids: Vec<String>,
    pub crawl_results: Vec<CrawlStageOutcome>,
    pub assignment_results: Vec<AssignmentStageOutcome>,
    pub due_date_results: Vec<DueDateStageOutcome>,
    pub total_errors: u32,
    pub duration_s: f64,
}

// ---------------------------------------------------------------------------
// Restate serde impls
// ---------------------------------------------------------------------------

crate::impl_restate_serde!(SyncPipelineRequest);
crate::impl_restate_serde!(EmptyRequest);
crate::impl_restate_serde!(CreatedJobsResult);
crate::impl_restate_serde!(CrawlStageOutcome);
crate::impl_restate_serde!(AssignmentStageOutcome);
crate::impl_restate_serde!(DueDateStageOutcome);
crate::impl_restate_serde!(SyncPipelineResult);
