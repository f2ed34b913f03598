//! Stage activities. Each one is pure with respect to its job sync id:
//! blob writes upsert, assignment rows are keyed by course + title, and the
//! due-date pointer is replaced — so a crash-resume re-invocation never
//! duplicates work.

mod retry;

pub use retry::{with_retries, RetryPolicy};

use duesync_common::{normalize_cookies, SyncError};
use duesync_store::{Assignment, AuthBundle, DueDate, JobSync, JobSyncGroup, NewDueDate, Source};
use tracing::{info, warn};
use uuid::Uuid;

use crate::crawler::Crawler;
use crate::extractor::{AssignmentExtractor, PriorAssignment};
use crate::resolver::{AssignmentToResolve, DueDateResolver};
use crate::tree::{CrawlStats, PageNode};
use crate::workflows::SyncDeps;

#[derive(Debug, Clone)]
pub struct CreatedJobs {
    pub group_id: Uuid,
    pub job_sync_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentStageStats {
    pub assignments_found: u32,
    pub assignments_created: u32,
    pub touched_assignment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct DueDateStageStats {
    pub due_dates_found: u32,
    pub due_dates_created: u32,
    pub assignments_updated: u32,
}

/// Create the job sync group and one job sync per enrolled
/// `(course, source)` pair, in a single transaction.
pub async fn create_sync_jobs(
    deps: &SyncDeps,
    user_id: Uuid,
    course_ids: Option<&[Uuid]>,
) -> Result<CreatedJobs, SyncError> {
    let sources = Source::find_for_user(user_id, course_ids, &deps.pool).await?;

    let pairs: Vec<(Uuid, Uuid)> = sources.iter().map(|s| (s.course_id, s.id)).collect();
    let (group, jobs) = JobSyncGroup::create_with_jobs(user_id, &pairs, &deps.pool).await?;

    info!(
        group_id = %group.id,
        job_syncs = jobs.len(),
        "Created sync jobs"
    );

    Ok(CreatedJobs {
        group_id: group.id,
        job_sync_ids: jobs.iter().map(|j| j.id).collect(),
    })
}

/// Mark the group complete. Runs unconditionally at the end of the
/// pipeline so a group is never considered in-flight forever.
pub async fn complete_sync_group(deps: &SyncDeps, group_id: Uuid) -> Result<(), SyncError> {
    JobSyncGroup::complete(group_id, &deps.pool).await?;
    info!(group_id = %group_id, "Sync group marked complete");
    Ok(())
}

/// Stage C: crawl one job sync's source and persist its page tree.
pub async fn crawl_course(
    deps: &SyncDeps,
    job_sync_id: Uuid,
    force_refresh: bool,
) -> Result<CrawlStats, SyncError> {
    let job = JobSync::find_optional(job_sync_id, &deps.pool)
        .await?
        .ok_or_else(|| SyncError::DataInvariant(format!("job sync {job_sync_id} not found")))?;

    let group = JobSyncGroup::find_by_id(job.group_id, &deps.pool).await?;
    let source = Source::find_by_id(job.source_id, &deps.pool).await?;

    let bundle = if source.requires_auth {
        let bundle = AuthBundle::latest_for_user(group.user_id, &deps.pool)
            .await?
            .ok_or_else(|| {
                SyncError::Authentication(format!(
                    "no auth bundle for user {} on authenticated source",
                    group.user_id
                ))
            })?;
        Some(bundle)
    } else {
        None
    };

    let cookies = bundle
        .as_ref()
        .map(|b| normalize_cookies(&b.cookie_set))
        .unwrap_or_default();

    let previous_tree: Option<PageNode> = if force_refresh {
        None
    } else {
        JobSync::previous_tree(job.course_id, job.id, &deps.pool)
            .await?
            .and_then(|value| serde_json::from_value(value).ok())
    };

    let cookie_values: Vec<serde_json::Value> = cookies
        .iter()
        .filter_map(|c| serde_json::to_value(c).ok())
        .collect();
    let session = deps.browser.session(cookie_values);

    let crawler = Crawler::new(
        &session,
        deps.link_oracle.as_ref(),
        deps.blobs.as_ref(),
        job.id.to_string(),
    );

    let outcome = match crawler.crawl(&source.url, previous_tree.as_ref()).await {
        Ok(outcome) => outcome,
        Err(e @ SyncError::Authentication(_)) => {
            if let Some(bundle) = bundle {
                warn!(bundle_id = %bundle.id, "Marking auth bundle out of sync");
                let _ = AuthBundle::mark_out_of_sync(bundle.id, &deps.pool).await;
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let tree_value = serde_json::to_value(&outcome.tree)
        .map_err(|e| SyncError::Fatal(format!("page tree serialization: {e}")))?;
    JobSync::set_page_tree(job.id, &tree_value, &deps.pool).await?;

    Ok(outcome.stats)
}

/// Stage A: extract assignments from the job sync's changed pages into the
/// course's canonical set.
pub async fn extract_assignments(
    deps: &SyncDeps,
    job_sync_id: Uuid,
) -> Result<AssignmentStageStats, SyncError> {
    let job = JobSync::find_optional(job_sync_id, &deps.pool)
        .await?
        .ok_or_else(|| SyncError::DataInvariant(format!("job sync {job_sync_id} not found")))?;

    let tree_value = job.page_tree.ok_or_else(|| {
        SyncError::DataInvariant(format!(
            "job sync {job_sync_id} has no page tree; crawl stage has not succeeded"
        ))
    })?;
    let tree: PageNode = serde_json::from_value(tree_value)
        .map_err(|e| SyncError::DataInvariant(format!("malformed page tree: {e}")))?;

    let prior_rows = Assignment::for_course(job.course_id, &deps.pool).await?;
    let prior: Vec<PriorAssignment> = prior_rows
        .iter()
        .map(|a| PriorAssignment {
            id: Some(a.id),
            title: a.title.clone(),
            description: a.description.clone(),
            source_page_paths: a.source_page_paths.clone(),
        })
        .collect();

    let extractor = AssignmentExtractor::new(
        deps.extraction_oracle.as_ref(),
        deps.blobs.as_ref(),
        deps.extract_policy,
    );
    let outcome = extractor.extract_course(&tree, &prior).await?;

    let mut stats = AssignmentStageStats {
        assignments_found: outcome.deltas.len() as u32,
        ..Default::default()
    };

    for delta in &outcome.deltas {
        let assignment_id = if delta.created {
            let row = Assignment::upsert(
                job.course_id,
                &delta.title,
                &delta.description,
                delta.content_hash.as_deref(),
                delta.source_url.as_deref(),
                &deps.pool,
            )
            .await?;
            stats.assignments_created += 1;
            row.id
        } else {
            match prior.iter().find(|p| p.title == delta.title).and_then(|p| p.id) {
                Some(id) => id,
                // Touched row missing from the prior snapshot (concurrent
                // sync of another source): converge on the keyed row.
                None => {
                    Assignment::upsert(
                        job.course_id,
                        &delta.title,
                        &delta.description,
                        None,
                        None,
                        &deps.pool,
                    )
                    .await?
                    .id
                }
            }
        };

        for path in &delta.new_paths {
            Assignment::append_source_path(assignment_id, path, &deps.pool).await?;
        }

        stats.touched_assignment_ids.push(assignment_id);
    }

    info!(
        job_sync_id = %job_sync_id,
        found = stats.assignments_found,
        created = stats.assignments_created,
        "Assignment stage complete"
    );

    Ok(stats)
}

/// Stage D: resolve and pin one due date per touched assignment.
pub async fn resolve_due_dates(
    deps: &SyncDeps,
    job_sync_id: Uuid,
    assignment_ids: &[Uuid],
) -> Result<DueDateStageStats, SyncError> {
    if assignment_ids.is_empty() {
        info!(job_sync_id = %job_sync_id, "No assignments to resolve");
        return Ok(DueDateStageStats::default());
    }

    let rows = Assignment::find_by_ids(assignment_ids, &deps.pool).await?;
    let to_resolve: Vec<AssignmentToResolve> = rows
        .iter()
        .map(|a| AssignmentToResolve {
            id: a.id,
            title: a.title.clone(),
            description: a.description.clone(),
            source_page_paths: a.source_page_paths.clone(),
        })
        .collect();

    let resolver = DueDateResolver::new(deps.due_date_oracle.as_ref(), deps.blobs.as_ref());
    let resolved = resolver.resolve_all(&to_resolve).await?;

    let mut stats = DueDateStageStats::default();

    for item in &resolved {
        let title = format!("Due: {}", item.title);
        let row = DueDate::create(
            NewDueDate {
                assignment_id: item.assignment_id,
                date: item.parsed_date,
                date_certain: item.due_date.date_certain,
                time_certain: item.due_date.time_certain,
                confidence: item.due_date.confidence,
                title: &title,
                description: &item.due_date.reasoning,
                url: item.due_date.source_urls.first().map(String::as_str),
            },
            &deps.pool,
        )
        .await?;
        stats.due_dates_created += 1;

        Assignment::pin_due_date(item.assignment_id, row.id, &deps.pool).await?;
        stats.assignments_updated += 1;

        if item.parsed_date.is_some() {
            stats.due_dates_found += 1;
        }
    }

    info!(
        job_sync_id = %job_sync_id,
        found = stats.due_dates_found,
        created = stats.due_dates_created,
        "Due date stage complete"
    );

    Ok(stats)
}
