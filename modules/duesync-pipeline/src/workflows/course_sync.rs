//! The durable sync pipeline: create jobs, then fan out crawl →
//! assignments → due dates across job syncs. Per-id failures are captured
//! as typed outcomes rather than raised, so every stage reports every id
//! and the group is always marked complete at the end.

use std::sync::Arc;

use futures::future::join_all;
use restate_sdk::prelude::*;
use tracing::{error, info};
use uuid::Uuid;

use crate::activities::{
    complete_sync_group, crawl_course, create_sync_jobs, extract_assignments, resolve_due_dates,
    with_retries, RetryPolicy,
};

use super::types::*;
use super::{
    SyncDeps, ASSIGNMENTS_TIMEOUT, CRAWL_TIMEOUT, CREATE_JOBS_TIMEOUT, DUE_DATES_TIMEOUT,
};

#[restate_sdk::workflow]
#[name = "CourseSyncWorkflow"]
pub trait CourseSyncWorkflow {
    async fn run(req: SyncPipelineRequest) -> Result<SyncPipelineResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct CourseSyncWorkflowImpl {
    deps: Arc<SyncDeps>,
}

impl CourseSyncWorkflowImpl {
    pub fn with_deps(deps: Arc<SyncDeps>) -> Self {
        Self { deps }
    }
}

impl CourseSyncWorkflow for CourseSyncWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        req: SyncPipelineRequest,
    ) -> Result<SyncPipelineResult, HandlerError> {
        let started = std::time::Instant::now();

        let user_id: Uuid = req.user_id.parse().map_err(|e: uuid::Error| {
            TerminalError::new(format!("Invalid user UUID in request: {e}"))
        })?;
        let course_ids: Option<Vec<Uuid>> = req
            .course_ids
            .as_ref()
            .map(|ids| {
                ids.iter()
                    .map(|s| s.parse())
                    .collect::<Result<Vec<Uuid>, uuid::Error>>()
            })
            .transpose()
            .map_err(|e| TerminalError::new(format!("Invalid course UUID in request: {e}")))?;

        // Step 1: create the group and its job syncs (journaled).
        ctx.set("status", "Creating sync jobs...".to_string());
        let deps = self.deps.clone();
        let created: CreatedJobsResult = ctx
            .run(move || {
                let deps = deps.clone();
                let course_ids = course_ids.clone();
                async move {
                    let created = tokio::time::timeout(
                        CREATE_JOBS_TIMEOUT,
                        with_retries("create_sync_jobs", &RetryPolicy::default(), || {
                            create_sync_jobs(&deps, user_id, course_ids.as_deref())
                        }),
                    )
                    .await
                    .map_err(|_| -> HandlerError {
                        TerminalError::new("create_sync_jobs timed out").into()
                    })?
                    .map_err(|e| -> HandlerError { TerminalError::new(e.to_string()).into() })?;

                    Ok(CreatedJobsResult {
                        group_id: created.group_id.to_string(),
                        job_sync_ids: created
                            .job_sync_ids
                            .iter()
                            .map(ToString::to_string)
                            .collect(),
                    })
                }
            })
            .await?;

        info!(
            group_id = created.group_id,
            job_syncs = created.job_sync_ids.len(),
            "Sync jobs created"
        );

        // Step 2: nothing to do — complete the group and return.
        if created.job_sync_ids.is_empty() {
            self.finish_group(&ctx, &created.group_id).await?;
            ctx.set("status", "Sync pipeline complete (no courses)".to_string());
            return Ok(SyncPipelineResult {
                group_id: created.group_id,
                job_sync_ids: Vec::new(),
                crawl_results: Vec::new(),
                assignment_results: Vec::new(),
                due_date_results: Vec::new(),
                total_errors: 0,
                duration_s: started.elapsed().as_secs_f64(),
            });
        }

        // Step 3: crawl fan-out.
        ctx.set("status", "Crawling course sources...".to_string());
        let force_refresh = req.force_refresh;
        let crawl_futures: Vec<_> = created
            .job_sync_ids
            .iter()
            .map(|id| {
                let deps = self.deps.clone();
                let id = id.clone();
                ctx.run(move || {
                    let deps = deps.clone();
                    let id = id.clone();
                    async move { Ok::<_, HandlerError>(run_crawl(&deps, &id, force_refresh).await) }
                })
            })
            .collect();
        let crawl_results: Vec<CrawlStageOutcome> = join_all(crawl_futures)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        // Step 4: assignment fan-out. A failed crawl short-circuits into a
        // stage-A failure so every stage reports every id.
        ctx.set("status", "Extracting assignments...".to_string());
        let assignment_futures: Vec<_> = created
            .job_sync_ids
            .iter()
            .zip(&crawl_results)
            .map(|(id, crawl)| {
                let deps = self.deps.clone();
                let id = id.clone();
                let crawl_ok = crawl.success;
                ctx.run(move || {
                    let deps = deps.clone();
                    let id = id.clone();
                    async move {
                        if !crawl_ok {
                            return Ok::<_, HandlerError>(AssignmentStageOutcome::failed(
                                &id,
                                "crawl stage failed for this job sync",
                            ));
                        }
                        Ok(run_assignments(&deps, &id).await)
                    }
                })
            })
            .collect();
        let assignment_results: Vec<AssignmentStageOutcome> = join_all(assignment_futures)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        // Step 5: due-date fan-out over stage A's touched assignments.
        ctx.set("status", "Resolving due dates...".to_string());
        let due_date_futures: Vec<_> = created
            .job_sync_ids
            .iter()
            .zip(&assignment_results)
            .map(|(id, assignments)| {
                let deps = self.deps.clone();
                let id = id.clone();
                let stage_a_ok = assignments.success;
                let touched = assignments.touched_assignment_ids.clone();
                ctx.run(move || {
                    let deps = deps.clone();
                    let id = id.clone();
                    let touched = touched.clone();
                    async move {
                        if !stage_a_ok {
                            return Ok::<_, HandlerError>(DueDateStageOutcome::failed(
                                &id,
                                "assignment stage failed for this job sync",
                            ));
                        }
                        Ok(run_due_dates(&deps, &id, &touched).await)
                    }
                })
            })
            .collect();
        let due_date_results: Vec<DueDateStageOutcome> = join_all(due_date_futures)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        // Step 6: the group completes no matter what the stages reported.
        self.finish_group(&ctx, &created.group_id).await?;

        let total_errors = crawl_results.iter().filter(|r| !r.success).count()
            + assignment_results.iter().filter(|r| !r.success).count()
            + due_date_results.iter().filter(|r| !r.success).count();
        let duration_s = started.elapsed().as_secs_f64();

        ctx.set(
            "status",
            format!(
                "Sync pipeline complete: {} job syncs, {} errors",
                created.job_sync_ids.len(),
                total_errors
            ),
        );
        info!(
            group_id = created.group_id,
            total_errors,
            duration_s,
            "Sync pipeline complete"
        );

        Ok(SyncPipelineResult {
            group_id: created.group_id,
            job_sync_ids: created.job_sync_ids,
            crawl_results,
            assignment_results,
            due_date_results,
            total_errors: total_errors as u32,
            duration_s,
        })
    }

    async fn get_status(
        &self,
        ctx: SharedWorkflowContext<'_>,
        _req: EmptyRequest,
    ) -> Result<String, HandlerError> {
        super::read_workflow_status(&ctx).await
    }
}

impl CourseSyncWorkflowImpl {
    /// Journaled group completion.
    async fn finish_group(
        &self,
        ctx: &WorkflowContext<'_>,
        group_id: &str,
    ) -> Result<(), HandlerError> {
        let deps = self.deps.clone();
        let group_id = group_id.to_string();
        ctx.run(move || {
            let deps = deps.clone();
            let group_id = group_id.clone();
            async move {
                let id: Uuid = group_id.parse().map_err(|e: uuid::Error| -> HandlerError {
                    TerminalError::new(format!("Invalid group UUID: {e}")).into()
                })?;
                with_retries("complete_sync_group", &RetryPolicy::default(), || {
                    complete_sync_group(&deps, id)
                })
                .await
                .map_err(|e| -> HandlerError { TerminalError::new(e.to_string()).into() })?;
                Ok(())
            }
        })
        .await
        .map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Stage wrappers: retry + timeout, errors folded into typed outcomes
// ---------------------------------------------------------------------------

async fn run_crawl(deps: &SyncDeps, job_sync_id: &str, force_refresh: bool) -> CrawlStageOutcome {
    let id: Uuid = match job_sync_id.parse() {
        Ok(id) => id,
        Err(e) => return CrawlStageOutcome::failed(job_sync_id, format!("invalid id: {e}")),
    };

    let result = tokio::time::timeout(
        CRAWL_TIMEOUT,
        with_retries("crawl_course", &RetryPolicy::default(), || {
            crawl_course(deps, id, force_refresh)
        }),
    )
    .await;

    match result {
        Ok(Ok(stats)) => CrawlStageOutcome {
            job_sync_id: job_sync_id.to_string(),
            success: true,
            pages_total: stats.pages_total,
            pages_new: stats.pages_new,
            pages_changed: stats.pages_changed,
            pages_unchanged: stats.pages_unchanged,
            pages_with_assignments: stats.pages_with_assignments,
            pages_failed: stats.pages_failed,
            error_message: None,
        },
        Ok(Err(e)) => {
            error!(job_sync_id, error = %e, "Crawl stage failed");
            CrawlStageOutcome::failed(job_sync_id, e.to_string())
        }
        Err(_) => {
            error!(job_sync_id, "Crawl stage timed out");
            CrawlStageOutcome::failed(
                job_sync_id,
                format!("timed out after {}s", CRAWL_TIMEOUT.as_secs()),
            )
        }
    }
}

async fn run_assignments(deps: &SyncDeps, job_sync_id: &str) -> AssignmentStageOutcome {
    let id: Uuid = match job_sync_id.parse() {
        Ok(id) => id,
        Err(e) => return AssignmentStageOutcome::failed(job_sync_id, format!("invalid id: {e}")),
    };

    let result = tokio::time::timeout(
        ASSIGNMENTS_TIMEOUT,
        with_retries("extract_assignments", &RetryPolicy::default(), || {
            extract_assignments(deps, id)
        }),
    )
    .await;

    match result {
        Ok(Ok(stats)) => AssignmentStageOutcome {
            job_sync_id: job_sync_id.to_string(),
            success: true,
            assignments_found: stats.assignments_found,
            assignments_created: stats.assignments_created,
            touched_assignment_ids: stats
                .touched_assignment_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            error_message: None,
        },
        Ok(Err(e)) => {
            error!(job_sync_id, error = %e, "Assignment stage failed");
            AssignmentStageOutcome::failed(job_sync_id, e.to_string())
        }
        Err(_) => {
            error!(job_sync_id, "Assignment stage timed out");
            AssignmentStageOutcome::failed(
                job_sync_id,
                format!("timed out after {}s", ASSIGNMENTS_TIMEOUT.as_secs()),
            )
        }
    }
}

async fn run_due_dates(
    deps: &SyncDeps,
    job_sync_id: &str,
    touched_ids: &[String],
) -> DueDateStageOutcome {
    let id: Uuid = match job_sync_id.parse() {
        Ok(id) => id,
        Err(e) => return DueDateStageOutcome::failed(job_sync_id, format!("invalid id: {e}")),
    };

    let assignment_ids: Vec<Uuid> = touched_ids.iter().filter_map(|s| s.parse().ok()).collect();

    let result = tokio::time::timeout(
        DUE_DATES_TIMEOUT,
        with_retries("resolve_due_dates", &RetryPolicy::default(), || {
            resolve_due_dates(deps, id, &assignment_ids)
        }),
    )
    .await;

    match result {
        Ok(Ok(stats)) => DueDateStageOutcome {
            job_sync_id: job_sync_id.to_string(),
            success: true,
            due_dates_found: stats.due_dates_found,
            due_dates_created: stats.due_dates_created,
            assignments_updated: stats.assignments_updated,
            error_message: None,
        },
        Ok(Err(e)) => {
            error!(job_sync_id, error = %e, "Due date stage failed");
            DueDateStageOutcome::failed(job_sync_id, e.to_string())
        }
        Err(_) => {
            error!(job_sync_id, "Due date stage timed out");
            DueDateStageOutcome::failed(
                job_sync_id,
                format!("timed out after {}s", DUE_DATES_TIMEOUT.as_secs()),
            )
        }
    }
}
