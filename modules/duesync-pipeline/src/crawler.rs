// Authenticated breadth-first crawler. Level-synchronous and serialized
// through a single browser session so cookies are reused; parallelism lives
// across job syncs, not inside one.

use std::collections::HashSet;

use async_trait::async_trait;
use browser_client::{BrowserError, BrowserSession, RenderedPage};
use chrono::Utc;
use duesync_common::SyncError;
use duesync_store::{blob_key, BlobStore};
use tracing::{debug, info, warn};

use crate::hasher::{content_hash, has_changed};
use crate::links::{canonical, resolve_link};
use crate::oracles::{html_to_text, LinkOracle};
use crate::tree::{CrawlStats, PageNode};

/// Maximum node depth; the root is depth 0.
pub const MAX_DEPTH: usize = 3;

/// Fetches one rendered page. Implemented by the real browser session;
/// tests substitute a scripted fetcher.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> browser_client::Result<RenderedPage>;
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn fetch(&self, url: &str) -> browser_client::Result<RenderedPage> {
        BrowserSession::fetch(self, url).await
    }
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub tree: PageNode,
    pub stats: CrawlStats,
}

pub struct Crawler<'a> {
    fetcher: &'a dyn PageFetcher,
    link_oracle: &'a dyn LinkOracle,
    blobs: &'a dyn BlobStore,
    /// Blob namespace — the owning job sync id.
    namespace: String,
}

struct Slot {
    node: PageNode,
    children: Vec<usize>,
}

impl<'a> Crawler<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        link_oracle: &'a dyn LinkOracle,
        blobs: &'a dyn BlobStore,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            link_oracle,
            blobs,
            namespace: namespace.into(),
        }
    }

    /// Walk the site from `root_url`, producing a page tree with hashes and
    /// change flags. `previous_tree` is the last sync's tree for this
    /// course; without it every page counts as new.
    pub async fn crawl(
        &self,
        root_url: &str,
        previous_tree: Option<&PageNode>,
    ) -> Result<CrawlOutcome, SyncError> {
        let previous_hashes = previous_tree.map(PageNode::hash_index).unwrap_or_default();
        if !previous_hashes.is_empty() {
            info!(
                pages = previous_hashes.len(),
                "Found pages from previous sync"
            );
        }

        let root = canonical(root_url);
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root.clone());

        let mut slots = vec![Slot {
            node: PageNode::new(&root),
            children: Vec::new(),
        }];
        let mut frontier = vec![0usize];
        let mut depth = 0usize;

        while !frontier.is_empty() {
            debug!(depth, width = frontier.len(), "Processing crawl level");
            let mut next_frontier = Vec::new();

            for idx in frontier {
                let links = self
                    .visit(idx, &mut slots, &previous_hashes, depth == 0)
                    .await?;

                if depth < MAX_DEPTH {
                    for link in links {
                        if visited.insert(link.clone()) {
                            let child_idx = slots.len();
                            slots.push(Slot {
                                node: PageNode::new(&link),
                                children: Vec::new(),
                            });
                            slots[idx].children.push(child_idx);
                            next_frontier.push(child_idx);
                        }
                    }
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        let tree = assemble(&slots, 0);
        let stats = tree.stats();

        info!(
            pages_total = stats.pages_total,
            pages_new = stats.pages_new,
            pages_changed = stats.pages_changed,
            pages_unchanged = stats.pages_unchanged,
            pages_with_assignments = stats.pages_with_assignments,
            pages_failed = stats.pages_failed,
            "Crawl complete"
        );

        Ok(CrawlOutcome { tree, stats })
    }

    /// Fetch, hash, persist, and analyze one page. Returns the resolved
    /// candidate links. Per-page failures mark the node and keep siblings
    /// going; only an unreachable browser service (or an auth rejection at
    /// the root) aborts the stage.
    async fn visit(
        &self,
        idx: usize,
        slots: &mut [Slot],
        previous_hashes: &std::collections::HashMap<String, String>,
        is_root: bool,
    ) -> Result<Vec<String>, SyncError> {
        let url = slots[idx].node.url.clone();

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(BrowserError::Unreachable(msg)) => {
                return Err(SyncError::Fatal(format!(
                    "browser service unreachable: {msg}"
                )));
            }
            Err(BrowserError::Api { status, message })
                if is_root && (status == 401 || status == 403) =>
            {
                return Err(SyncError::Authentication(format!(
                    "fetch of {url} rejected with status {status}: {message}"
                )));
            }
            Err(e) => {
                warn!(url, error = %e, "Page fetch failed");
                let node = &mut slots[idx].node;
                node.error = Some(e.to_string());
                // No hash to compare against, so force a retry next sync.
                node.content_changed = true;
                return Ok(Vec::new());
            }
        };

        let hash = content_hash(&page.html, &url);
        {
            let node = &mut slots[idx].node;
            node.title = page.title.clone();
            node.content_hash = Some(hash.clone());
            node.last_scraped = Some(Utc::now());
            node.previous_hash = previous_hashes.get(&url).cloned();
            node.content_changed = has_changed(&hash, node.previous_hash.as_deref());

            if node.previous_hash.is_none() {
                debug!(url, "New page");
            } else if node.content_changed {
                debug!(url, "Content changed");
            } else {
                debug!(url, "Content unchanged");
            }
        }

        // HTML is stored for every visited page; the due-date resolver reads
        // arbitrary source paths later.
        match self
            .blobs
            .put(&self.namespace, &blob_key(&url), page.html.as_bytes())
            .await
        {
            Ok(path) => slots[idx].node.html_path = Some(path),
            Err(e) => {
                warn!(url, error = %e, "Blob upload failed");
                let node = &mut slots[idx].node;
                node.error = Some(format!("blob upload: {e}"));
                node.content_changed = true;
            }
        }

        let text = html_to_text(&page.html);
        match self.link_oracle.analyze(&text, &url).await {
            Ok(analysis) => {
                slots[idx].node.assignment_data_found = analysis.assignment_data_found;
                Ok(analysis
                    .relevant_links
                    .iter()
                    .filter_map(|raw| resolve_link(&url, raw))
                    .collect())
            }
            Err(e) => {
                warn!(url, error = %e, "Link analysis failed");
                Ok(Vec::new())
            }
        }
    }
}

fn assemble(slots: &[Slot], idx: usize) -> PageNode {
    let mut node = slots[idx].node.clone();
    node.children = slots[idx]
        .children
        .iter()
        .map(|&child| assemble(slots, child))
        .collect();
    node
}
