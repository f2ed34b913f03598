use anyhow::Result;
use async_trait::async_trait;
use llm_client::Claude;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{truncate, LINK_CONTEXT_LIMIT, ORACLE_MODEL};

/// What the link oracle reports about one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LinkAnalysis {
    /// Links on this page that may lead to homework or assignment material.
    pub relevant_links: Vec<String>,
    /// True if this page itself contains assignment data with due dates.
    pub assignment_data_found: bool,
    /// Short justification for the verdict.
    pub reason: String,
}

/// Decides which outbound links are worth crawling and whether the current
/// page carries assignment data. Must tolerate truncated input.
#[async_trait]
pub trait LinkOracle: Send + Sync {
    async fn analyze(&self, page_text: &str, current_url: &str) -> Result<LinkAnalysis>;
}

pub struct ClaudeLinkOracle {
    claude: Claude,
}

impl ClaudeLinkOracle {
    pub fn new(api_key: &str) -> Self {
        Self {
            claude: Claude::new(api_key, ORACLE_MODEL),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are analyzing a course webpage to find \
homework/assignment related links and check for assignment data.";

#[async_trait]
impl LinkOracle for ClaudeLinkOracle {
    async fn analyze(&self, page_text: &str, current_url: &str) -> Result<LinkAnalysis> {
        let content = truncate(page_text, LINK_CONTEXT_LIMIT);

        let prompt = format!(
            "Given this webpage from a course site, I need to:\n\
             1. Find links that might lead to homework/assignments\n\
             2. Check if this page contains assignment data with due dates\n\n\
             Current URL: {current_url}\n\n\
             Webpage content:\n{content}"
        );

        let analysis: LinkAnalysis = self.claude.extract(SYSTEM_PROMPT, prompt).await?;

        debug!(
            url = current_url,
            links = analysis.relevant_links.len(),
            has_assignments = analysis.assignment_data_found,
            "Link analysis complete"
        );

        Ok(analysis)
    }
}
