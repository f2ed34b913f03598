//! Deterministic fakes for the pipeline: a scripted fetcher and scripted
//! oracles, plus an in-memory course state that plays the role of the
//! assignment store across simulated syncs.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use browser_client::{BrowserError, RenderedPage};
use uuid::Uuid;

use duesync_pipeline::crawler::{CrawlOutcome, Crawler, PageFetcher};
use duesync_pipeline::extractor::{
    AssignmentDelta, AssignmentExtractor, ExtractPolicy, ExtractionOutcome, PriorAssignment,
};
use duesync_pipeline::oracles::{
    DueDateOracle, ExtractedAssignment, ExtractionOracle, LinkAnalysis, LinkOracle,
    ResolvedDueDate,
};
use duesync_pipeline::resolver::{AssignmentToResolve, DueDateResolver, ResolvedAssignment};
use duesync_pipeline::tree::PageNode;
use duesync_store::MemoryBlobStore;

// ---------------------------------------------------------------------------
// Scripted fetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFetcher {
    pub pages: HashMap<String, String>,
    /// URLs that time out (per-page failure).
    pub failing: HashSet<String>,
    /// URLs rejected with 403 (auth wall).
    pub forbidden: HashSet<String>,
    /// URLs where the browser service itself is down.
    pub unreachable: HashSet<String>,
}

impl FakeFetcher {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> browser_client::Result<RenderedPage> {
        if self.unreachable.contains(url) {
            return Err(BrowserError::Unreachable("connection refused".into()));
        }
        if self.forbidden.contains(url) {
            return Err(BrowserError::Api {
                status: 403,
                message: "login required".into(),
            });
        }
        if self.failing.contains(url) {
            return Err(BrowserError::Api {
                status: 408,
                message: "goto timeout".into(),
            });
        }
        match self.pages.get(url) {
            Some(html) => Ok(RenderedPage {
                html: html.clone(),
                title: url.rsplit('/').next().unwrap_or("page").to_string(),
            }),
            None => Err(BrowserError::Api {
                status: 404,
                message: "not found".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted oracles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLinkOracle {
    pub links: HashMap<String, Vec<String>>,
    pub assignment_pages: HashSet<String>,
}

impl FakeLinkOracle {
    pub fn new(links: &[(&str, &[&str])], assignment_pages: &[&str]) -> Self {
        Self {
            links: links
                .iter()
                .map(|(url, hrefs)| {
                    (
                        url.to_string(),
                        hrefs.iter().map(|h| h.to_string()).collect(),
                    )
                })
                .collect(),
            assignment_pages: assignment_pages.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl LinkOracle for FakeLinkOracle {
    async fn analyze(&self, _page_text: &str, current_url: &str) -> Result<LinkAnalysis> {
        Ok(LinkAnalysis {
            relevant_links: self.links.get(current_url).cloned().unwrap_or_default(),
            assignment_data_found: self.assignment_pages.contains(current_url),
            reason: "scripted".into(),
        })
    }
}

/// Returns configured assignments for any page whose text contains the
/// marker, judging `repeated` against the prior list like the real oracle.
#[derive(Default)]
pub struct FakeExtractionOracle {
    pub by_marker: Vec<(String, Vec<(String, String)>)>,
}

impl FakeExtractionOracle {
    pub fn new(by_marker: &[(&str, &[(&str, &str)])]) -> Self {
        Self {
            by_marker: by_marker
                .iter()
                .map(|(marker, assignments)| {
                    (
                        marker.to_string(),
                        assignments
                            .iter()
                            .map(|(t, d)| (t.to_string(), d.to_string()))
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ExtractionOracle for FakeExtractionOracle {
    async fn extract(
        &self,
        page_text: &str,
        prior_pretty: &str,
    ) -> Result<Vec<ExtractedAssignment>> {
        let mut out = Vec::new();
        for (marker, assignments) in &self.by_marker {
            if page_text.contains(marker.as_str()) {
                for (title, description) in assignments {
                    out.push(ExtractedAssignment {
                        title: title.clone(),
                        description: description.clone(),
                        repeated: prior_pretty.contains(title.as_str()),
                    });
                }
            }
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeDueDateOracle {
    /// Title → verdict. Missing titles resolve to no date.
    pub dates: HashMap<String, Option<ResolvedDueDate>>,
}

impl FakeDueDateOracle {
    pub fn with_date(mut self, title: &str, date: &str) -> Self {
        self.dates.insert(
            title.to_string(),
            Some(ResolvedDueDate {
                date: Some(date.to_string()),
                date_certain: true,
                time_certain: date.contains('T'),
                confidence: 0.9,
                source_urls: Vec::new(),
                reasoning: format!("syllabus lists {title} as due {date}"),
            }),
        );
        self
    }

    pub fn with_no_date(mut self, title: &str) -> Self {
        self.dates.insert(title.to_string(), None);
        self
    }
}

#[async_trait]
impl DueDateOracle for FakeDueDateOracle {
    async fn resolve(
        &self,
        title: &str,
        _description: &str,
        _sources_text: &str,
    ) -> Result<Option<ResolvedDueDate>> {
        Ok(self.dates.get(title).cloned().flatten())
    }
}

// ---------------------------------------------------------------------------
// In-memory course state (the store's role across simulated syncs)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CourseState {
    pub assignments: Vec<PriorAssignment>,
}

impl CourseState {
    pub fn apply(&mut self, deltas: &[AssignmentDelta]) {
        for delta in deltas {
            match self
                .assignments
                .iter_mut()
                .find(|a| a.title == delta.title)
            {
                Some(existing) => {
                    for path in &delta.new_paths {
                        if !existing.source_page_paths.contains(path) {
                            existing.source_page_paths.push(path.clone());
                        }
                    }
                }
                None => self.assignments.push(PriorAssignment {
                    id: Some(Uuid::new_v4()),
                    title: delta.title.clone(),
                    description: delta.description.clone(),
                    source_page_paths: delta.new_paths.clone(),
                }),
            }
        }
    }

    pub fn get(&self, title: &str) -> &PriorAssignment {
        self.assignments
            .iter()
            .find(|a| a.title == title)
            .unwrap_or_else(|| panic!("assignment {title} not in course state"))
    }

    pub fn to_resolve(&self) -> Vec<AssignmentToResolve> {
        self.assignments
            .iter()
            .map(|a| AssignmentToResolve {
                id: a.id.expect("persisted assignment has an id"),
                title: a.title.clone(),
                description: a.description.clone(),
                source_page_paths: a.source_page_paths.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// One-call sync driver
// ---------------------------------------------------------------------------

pub struct Harness {
    pub fetcher: FakeFetcher,
    pub link_oracle: FakeLinkOracle,
    pub extraction_oracle: FakeExtractionOracle,
    pub due_date_oracle: FakeDueDateOracle,
    pub blobs: MemoryBlobStore,
}

impl Harness {
    pub async fn crawl(
        &self,
        root: &str,
        namespace: &str,
        previous: Option<&PageNode>,
    ) -> Result<CrawlOutcome, duesync_common::SyncError> {
        Crawler::new(&self.fetcher, &self.link_oracle, &self.blobs, namespace)
            .crawl(root, previous)
            .await
    }

    pub async fn extract(
        &self,
        tree: &PageNode,
        prior: &[PriorAssignment],
    ) -> ExtractionOutcome {
        AssignmentExtractor::new(
            &self.extraction_oracle,
            &self.blobs,
            ExtractPolicy::ChangedPages,
        )
        .extract_course(tree, prior)
        .await
        .expect("extraction never fails with in-memory blobs")
    }

    pub async fn resolve(&self, items: &[AssignmentToResolve]) -> Vec<ResolvedAssignment> {
        DueDateResolver::new(&self.due_date_oracle, &self.blobs)
            .resolve_all(items)
            .await
            .expect("resolution never fails with in-memory blobs")
    }
}

/// Node depth per URL, for crawl-bound assertions.
pub fn depths(tree: &PageNode) -> HashMap<String, usize> {
    fn walk(node: &PageNode, depth: usize, out: &mut HashMap<String, usize>) {
        out.insert(node.url.clone(), depth);
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }
    let mut out = HashMap::new();
    walk(tree, 0, &mut out);
    out
}
