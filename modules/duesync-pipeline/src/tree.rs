// The crawler's output: a tree of visited pages with content hashes and
// change flags. Serialized as nested JSON onto the owning job sync and
// read back on the next sync for change detection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNode {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub assignment_data_found: bool,
    pub html_path: Option<String>,
    pub content_hash: Option<String>,
    pub previous_hash: Option<String>,
    /// New pages default to changed so they are always processed.
    #[serde(default = "default_changed")]
    pub content_changed: bool,
    pub last_scraped: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub children: Vec<PageNode>,
}

fn default_changed() -> bool {
    true
}

impl PageNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            assignment_data_found: false,
            html_path: None,
            content_hash: None,
            previous_hash: None,
            content_changed: true,
            last_scraped: None,
            error: None,
            children: Vec::new(),
        }
    }

    /// Preorder traversal (document order): a page is visited before the
    /// pages discovered from it.
    pub fn preorder(&self) -> Vec<&PageNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// URL → content hash for every hashed page in the tree. The previous
    /// sync's index drives this sync's change flags.
    pub fn hash_index(&self) -> HashMap<String, String> {
        self.preorder()
            .into_iter()
            .filter_map(|node| {
                node.content_hash
                    .as_ref()
                    .map(|hash| (node.url.clone(), hash.clone()))
            })
            .collect()
    }

    pub fn stats(&self) -> CrawlStats {
        let mut stats = CrawlStats::default();
        for node in self.preorder() {
            stats.pages_total += 1;
            if node.assignment_data_found {
                stats.pages_with_assignments += 1;
            }
            if node.error.is_some() {
                stats.pages_failed += 1;
            }
            if node.previous_hash.is_none() {
                stats.pages_new += 1;
            } else if node.content_changed {
                stats.pages_changed += 1;
            } else {
                stats.pages_unchanged += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_total: u32,
    pub pages_new: u32,
    pub pages_changed: u32,
    pub pages_unchanged: u32,
    pub pages_with_assignments: u32,
    pub pages_failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> PageNode {
        let mut root = PageNode::new("https://school.edu/home");
        root.content_hash = Some("h-root".into());
        root.previous_hash = Some("h-root".into());
        root.content_changed = false;

        let mut hw = PageNode::new("https://school.edu/hw");
        hw.content_hash = Some("h-hw".into());
        hw.previous_hash = Some("h-hw-old".into());
        hw.content_changed = true;
        hw.assignment_data_found = true;

        let mut week1 = PageNode::new("https://school.edu/hw/week1");
        week1.content_hash = Some("h-w1".into());
        week1.assignment_data_found = true;

        let mut broken = PageNode::new("https://school.edu/slow");
        broken.error = Some("goto timeout".into());

        hw.children.push(week1);
        root.children.push(hw);
        root.children.push(broken);
        root
    }

    #[test]
    fn preorder_is_document_order() {
        let tree = sample_tree();
        let urls: Vec<&str> = tree.preorder().iter().map(|n| n.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://school.edu/home",
                "https://school.edu/hw",
                "https://school.edu/hw/week1",
                "https://school.edu/slow",
            ]
        );
    }

    #[test]
    fn hash_index_skips_unhashed_nodes() {
        let index = sample_tree().hash_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index["https://school.edu/hw"], "h-hw");
        assert!(!index.contains_key("https://school.edu/slow"));
    }

    #[test]
    fn stats_bucket_each_page_once() {
        let stats = sample_tree().stats();
        assert_eq!(stats.pages_total, 4);
        assert_eq!(stats.pages_new, 2); // week1 + failed page
        assert_eq!(stats.pages_changed, 1);
        assert_eq!(stats.pages_unchanged, 1);
        assert_eq!(stats.pages_with_assignments, 2);
        assert_eq!(stats.pages_failed, 1);
    }

    #[test]
    fn tree_roundtrips_through_json() {
        let tree = sample_tree();
        let json = serde_json::to_value(&tree).unwrap();
        let back: PageNode = serde_json::from_value(json).unwrap();
        assert_eq!(back.preorder().len(), 4);
        assert_eq!(back.children[0].children[0].url, "https://school.edu/hw/week1");
        assert_eq!(back.children[1].error.as_deref(), Some("goto timeout"));
    }

    #[test]
    fn change_flag_defaults_to_true_when_absent() {
        let node: PageNode = serde_json::from_str(r#"{"url": "https://x.edu"}"#).unwrap();
        assert!(node.content_changed);
    }
}
