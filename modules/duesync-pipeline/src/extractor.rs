// Incremental maintenance of a course's canonical assignment set. Only
// changed pages are re-read; the canonical set grows during the sync so
// later pages see what earlier pages added.

use duesync_common::SyncError;
use duesync_store::BlobStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::oracles::{html_to_text, ExtractionOracle};
use crate::tree::PageNode;

/// Which pages of the tree get extracted. `ChangedPages` is the default;
/// `AssignmentPagesOnly` additionally requires the crawler's
/// assignment-page flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractPolicy {
    ChangedPages,
    AssignmentPagesOnly,
}

/// A canonical assignment as known before this sync.
#[derive(Debug, Clone)]
pub struct PriorAssignment {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub source_page_paths: Vec<String>,
}

/// The merge plan for one assignment produced or touched by this sync.
/// Persistence applies it; tests assert on it directly.
#[derive(Debug, Clone)]
pub struct AssignmentDelta {
    pub title: String,
    pub description: String,
    /// Hash of the page that first evidenced the assignment (new rows only).
    pub content_hash: Option<String>,
    pub source_url: Option<String>,
    /// Blob paths to append to `source_page_paths`, in discovery order.
    pub new_paths: Vec<String>,
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub pages_processed: u32,
    pub pages_skipped: u32,
    pub pages_failed: u32,
    pub deltas: Vec<AssignmentDelta>,
}

struct CanonEntry {
    title: String,
    description: String,
    paths: Vec<String>,
    delta: Option<usize>,
}

pub struct AssignmentExtractor<'a> {
    oracle: &'a dyn ExtractionOracle,
    blobs: &'a dyn BlobStore,
    policy: ExtractPolicy,
}

impl<'a> AssignmentExtractor<'a> {
    pub fn new(
        oracle: &'a dyn ExtractionOracle,
        blobs: &'a dyn BlobStore,
        policy: ExtractPolicy,
    ) -> Self {
        Self {
            oracle,
            blobs,
            policy,
        }
    }

    /// Extract assignments from every target page of the tree, merging into
    /// the course's canonical set. Pages run in tree order, so the prior
    /// context for page N includes what pages 1..N-1 of this sync added.
    pub async fn extract_course(
        &self,
        tree: &PageNode,
        prior: &[PriorAssignment],
    ) -> Result<ExtractionOutcome, SyncError> {
        let mut canon: Vec<CanonEntry> = prior
            .iter()
            .map(|a| CanonEntry {
                title: a.title.clone(),
                description: a.description.clone(),
                paths: a.source_page_paths.clone(),
                delta: None,
            })
            .collect();

        let mut outcome = ExtractionOutcome::default();

        for node in tree.preorder() {
            let Some(html_path) = node.html_path.as_deref() else {
                continue;
            };
            if self.policy == ExtractPolicy::AssignmentPagesOnly && !node.assignment_data_found {
                continue;
            }
            if !node.content_changed {
                debug!(url = node.url, "Page unchanged, skipping extraction");
                outcome.pages_skipped += 1;
                continue;
            }

            let html = match self.blobs.get(html_path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(url = node.url, error = %e, "Failed to load page HTML");
                    outcome.pages_failed += 1;
                    continue;
                }
            };

            let text = html_to_text(&html);
            let prior_pretty = format_assignments(
                canon
                    .iter()
                    .map(|e| (e.title.as_str(), e.description.as_str())),
            );

            let records = match self.oracle.extract(&text, &prior_pretty).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(url = node.url, error = %e, "Assignment extraction failed");
                    outcome.pages_failed += 1;
                    continue;
                }
            };

            debug!(url = node.url, found = records.len(), "Page extracted");
            outcome.pages_processed += 1;

            for record in records {
                merge_record(
                    &mut canon,
                    &mut outcome.deltas,
                    record.title.trim(),
                    record.description.trim(),
                    node,
                    html_path,
                );
            }
        }

        info!(
            pages_processed = outcome.pages_processed,
            pages_skipped = outcome.pages_skipped,
            pages_failed = outcome.pages_failed,
            assignments_touched = outcome.deltas.len(),
            "Assignment extraction complete"
        );

        Ok(outcome)
    }
}

/// Blob paths are `<job_sync_id>/<md5(url)>.html`; the filename identifies
/// the page across syncs. Two paths with the same filename are the same
/// evidence page, so a re-scrape under a new sync namespace does not grow
/// the path set.
fn page_key(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Merge one extracted record into the canonical set.
///
/// An existing title always folds into its row — even when the oracle calls
/// it new — so re-running a sync can never create duplicates. A `repeated`
/// record with no match falls through to creation.
fn merge_record(
    canon: &mut Vec<CanonEntry>,
    deltas: &mut Vec<AssignmentDelta>,
    title: &str,
    description: &str,
    node: &PageNode,
    html_path: &str,
) {
    if title.is_empty() {
        return;
    }

    if let Some(entry) = canon.iter_mut().find(|e| e.title == title) {
        if entry.paths.iter().any(|p| page_key(p) == page_key(html_path)) {
            return;
        }
        entry.paths.push(html_path.to_string());

        match entry.delta {
            Some(i) => {
                if !deltas[i].new_paths.iter().any(|p| p == html_path) {
                    deltas[i].new_paths.push(html_path.to_string());
                }
            }
            None => {
                entry.delta = Some(deltas.len());
                deltas.push(AssignmentDelta {
                    title: entry.title.clone(),
                    description: entry.description.clone(),
                    content_hash: None,
                    source_url: None,
                    new_paths: vec![html_path.to_string()],
                    created: false,
                });
            }
        }
        return;
    }

    canon.push(CanonEntry {
        title: title.to_string(),
        description: description.to_string(),
        paths: vec![html_path.to_string()],
        delta: Some(deltas.len()),
    });
    deltas.push(AssignmentDelta {
        title: title.to_string(),
        description: description.to_string(),
        content_hash: node.content_hash.clone(),
        source_url: Some(node.url.clone()),
        new_paths: vec![html_path.to_string()],
        created: true,
    });
}

/// Pretty list of prior assignments for the oracle prompt.
pub(crate) fn format_assignments<'a>(
    items: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let lines: Vec<String> = items
        .enumerate()
        .map(|(i, (title, description))| format!("{}. {title}: {description}", i + 1))
        .collect();

    if lines.is_empty() {
        "None".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_list_formats_numbered() {
        let items = [
            ("HW1", "Implement a key-value store"),
            ("HW2", "Add replication"),
        ];
        let pretty = format_assignments(items.iter().map(|(t, d)| (*t, *d)));
        assert_eq!(
            pretty,
            "1. HW1: Implement a key-value store\n2. HW2: Add replication"
        );
    }

    #[test]
    fn empty_prior_list_is_none() {
        assert_eq!(format_assignments(std::iter::empty()), "None");
    }

    #[test]
    fn merge_folds_existing_titles_even_when_marked_new() {
        let mut canon = vec![CanonEntry {
            title: "HW1".into(),
            description: "old description".into(),
            paths: vec!["sync-0/p2.html".into()],
            delta: None,
        }];
        let mut deltas = Vec::new();
        let mut node = PageNode::new("https://school.edu/p5");
        node.content_hash = Some("h-p5".into());

        // Oracle says new, but the title already exists: treated as a touch.
        merge_record(
            &mut canon,
            &mut deltas,
            "HW1",
            "fresh wording",
            &node,
            "sync-1/p5.html",
        );

        assert_eq!(canon.len(), 1);
        assert_eq!(deltas.len(), 1);
        assert!(!deltas[0].created);
        assert_eq!(deltas[0].new_paths, vec!["sync-1/p5.html".to_string()]);
        // Canonical description wins over the re-extraction wording.
        assert_eq!(deltas[0].description, "old description");
    }

    #[test]
    fn merge_ignores_already_known_paths() {
        let mut canon = vec![CanonEntry {
            title: "HW1".into(),
            description: "desc".into(),
            paths: vec!["sync-0/p2.html".into()],
            delta: None,
        }];
        let mut deltas = Vec::new();
        let node = PageNode::new("https://school.edu/p2");

        merge_record(&mut canon, &mut deltas, "HW1", "desc", &node, "sync-0/p2.html");

        assert!(deltas.is_empty());
        assert_eq!(canon[0].paths.len(), 1);
    }

    #[test]
    fn merge_treats_same_page_across_namespaces_as_known() {
        let mut canon = vec![CanonEntry {
            title: "HW1".into(),
            description: "desc".into(),
            paths: vec!["sync-1/abc123.html".into()],
            delta: None,
        }];
        let mut deltas = Vec::new();
        let node = PageNode::new("https://school.edu/p5");

        // Same page, re-scraped under a later sync's namespace.
        merge_record(&mut canon, &mut deltas, "HW1", "desc", &node, "sync-9/abc123.html");

        assert!(deltas.is_empty());
        assert_eq!(canon[0].paths, vec!["sync-1/abc123.html".to_string()]);
    }

    #[test]
    fn merge_creates_new_assignment() {
        let mut canon = Vec::new();
        let mut deltas = Vec::new();
        let mut node = PageNode::new("https://school.edu/p2");
        node.content_hash = Some("h-p2".into());

        merge_record(
            &mut canon,
            &mut deltas,
            "HW3",
            "Write a consensus module",
            &node,
            "sync-1/p2.html",
        );

        assert_eq!(deltas.len(), 1);
        assert!(deltas[0].created);
        assert_eq!(deltas[0].content_hash.as_deref(), Some("h-p2"));
        assert_eq!(deltas[0].source_url.as_deref(), Some("https://school.edu/p2"));
        assert_eq!(canon[0].paths, vec!["sync-1/p2.html".to_string()]);
    }

    #[test]
    fn merge_skips_blank_titles() {
        let mut canon = Vec::new();
        let mut deltas = Vec::new();
        let node = PageNode::new("https://school.edu/p2");
        merge_record(&mut canon, &mut deltas, "", "junk", &node, "sync-1/p2.html");
        assert!(canon.is_empty());
        assert!(deltas.is_empty());
    }
}
