// One due date per assignment, resolved from the pages that evidenced it.
// Every assignment comes back with a verdict: a dated result, or a
// placeholder explaining why there is none.

use chrono::{DateTime, Utc};
use duesync_common::SyncError;
use duesync_store::BlobStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::oracles::{html_to_text, truncate, DueDateOracle, ResolvedDueDate, PER_PAGE_LIMIT, TOTAL_LIMIT};

/// Input to the resolver: an assignment and its evidence pages.
#[derive(Debug, Clone)]
pub struct AssignmentToResolve {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub source_page_paths: Vec<String>,
}

/// A resolver verdict, validated and ready to persist.
#[derive(Debug, Clone)]
pub struct ResolvedAssignment {
    pub assignment_id: Uuid,
    pub title: String,
    pub due_date: ResolvedDueDate,
    /// `due_date.date` parsed to a timestamp; `None` for placeholders and
    /// unparseable dates.
    pub parsed_date: Option<DateTime<Utc>>,
}

pub struct DueDateResolver<'a> {
    oracle: &'a dyn DueDateOracle,
    blobs: &'a dyn BlobStore,
}

impl<'a> DueDateResolver<'a> {
    pub fn new(oracle: &'a dyn DueDateOracle, blobs: &'a dyn BlobStore) -> Self {
        Self { oracle, blobs }
    }

    /// Resolve every assignment. Per-assignment failures yield placeholders
    /// and never block siblings.
    pub async fn resolve_all(
        &self,
        assignments: &[AssignmentToResolve],
    ) -> Result<Vec<ResolvedAssignment>, SyncError> {
        let mut resolved = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let mut due_date = self.resolve_one(assignment).await;
            let parsed_date = due_date.date.as_deref().and_then(parse_iso_date);

            // An unparseable date is treated as no date, with the raw text
            // preserved in the reasoning.
            if parsed_date.is_none() {
                if let Some(raw) = due_date.date.take() {
                    warn!(
                        title = assignment.title,
                        date = raw,
                        "Discarding unparseable due date"
                    );
                    due_date.reasoning =
                        format!("Discarded unparseable date '{raw}'. {}", due_date.reasoning);
                }
            }

            resolved.push(ResolvedAssignment {
                assignment_id: assignment.id,
                title: assignment.title.clone(),
                due_date,
                parsed_date,
            });
        }

        info!(
            assignments = assignments.len(),
            dated = resolved.iter().filter(|r| r.parsed_date.is_some()).count(),
            "Due date resolution complete"
        );

        Ok(resolved)
    }

    async fn resolve_one(&self, assignment: &AssignmentToResolve) -> ResolvedDueDate {
        let sources_text = self.collect_sources(assignment).await;

        if sources_text.trim().is_empty() {
            debug!(title = assignment.title, "No source content for assignment");
            return placeholder("no sources");
        }

        match self
            .oracle
            .resolve(&assignment.title, &assignment.description, &sources_text)
            .await
        {
            Ok(Some(due_date)) => due_date,
            Ok(None) => placeholder("No due date found in any course materials"),
            Err(e) => {
                warn!(title = assignment.title, error = %e, "Due date oracle failed");
                placeholder(&format!("resolver error: {e}"))
            }
        }
    }

    /// Concatenate the assignment's source pages, capped per page and in
    /// total. Unloadable pages are skipped.
    async fn collect_sources(&self, assignment: &AssignmentToResolve) -> String {
        let mut text = String::new();

        for (i, path) in assignment.source_page_paths.iter().enumerate() {
            let html = match self.blobs.get(path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(path, error = %e, "Failed to load source page");
                    continue;
                }
            };

            let page_text = html_to_text(&html);
            let section = format!(
                "\n\n{}\nSOURCE PAGE {}: {path}\n{}\n{}",
                "=".repeat(60),
                i + 1,
                "=".repeat(60),
                truncate(&page_text, PER_PAGE_LIMIT)
            );

            if text.len() + section.len() > TOTAL_LIMIT {
                let remaining = TOTAL_LIMIT.saturating_sub(text.len());
                text.push_str(truncate(&section, remaining));
                break;
            }
            text.push_str(&section);
        }

        text
    }
}

/// Placeholder verdict for assignments with no usable date.
pub fn placeholder(reason: &str) -> ResolvedDueDate {
    ResolvedDueDate {
        date: None,
        date_certain: false,
        time_certain: false,
        confidence: 0.0,
        source_urls: Vec::new(),
        reasoning: reason.to_string(),
    }
}

/// Parse an ISO-8601 due date. Accepts RFC 3339, a naive datetime, or a
/// bare date (midnight UTC).
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_formats_parse() {
        assert!(parse_iso_date("2026-09-15T23:59:00Z").is_some());
        assert!(parse_iso_date("2026-09-15T23:59:00+02:00").is_some());
        assert!(parse_iso_date("2026-09-15T23:59:00").is_some());
        assert!(parse_iso_date("2026-09-15").is_some());
    }

    #[test]
    fn non_iso_dates_do_not_parse() {
        assert!(parse_iso_date("next Friday").is_none());
        assert!(parse_iso_date("Sept 15, 2026").is_none());
        assert!(parse_iso_date("").is_none());
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let dt = parse_iso_date("2026-09-15").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-09-15T00:00:00+00:00");
    }

    #[test]
    fn placeholder_shape() {
        let p = placeholder("no sources");
        assert!(p.date.is_none());
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.reasoning, "no sources");
    }
}
