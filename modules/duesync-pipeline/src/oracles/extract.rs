use anyhow::Result;
use async_trait::async_trait;
use llm_client::Claude;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{truncate, EXTRACT_CONTEXT_LIMIT, ORACLE_MODEL};

/// One assignment found on a page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedAssignment {
    /// Title of the assignment.
    pub title: String,
    /// What the assignment asks for. No due-date details.
    pub description: String,
    /// True if this matches an assignment in the provided prior list,
    /// false if it is new.
    pub repeated: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PageExtraction {
    pub assignments: Vec<ExtractedAssignment>,
}

/// Finds every assignment mentioned on one page, judging repeats against
/// the course's prior canonical set.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(&self, page_text: &str, prior_pretty: &str)
        -> Result<Vec<ExtractedAssignment>>;
}

pub struct ClaudeExtractionOracle {
    claude: Claude,
}

impl ClaudeExtractionOracle {
    pub fn new(api_key: &str) -> Self {
        Self {
            claude: Claude::new(api_key, ORACLE_MODEL),
        }
    }
}

const SYSTEM_PROMPT: &str =
    "You are analyzing a course webpage to extract homework assignments.";

#[async_trait]
impl ExtractionOracle for ClaudeExtractionOracle {
    async fn extract(
        &self,
        page_text: &str,
        prior_pretty: &str,
    ) -> Result<Vec<ExtractedAssignment>> {
        let content = truncate(page_text, EXTRACT_CONTEXT_LIMIT);

        let prior_context = if prior_pretty.is_empty() || prior_pretty == "None" {
            String::new()
        } else {
            format!(
                "\nPreviously found assignments in this ENTIRE COURSE:\n{prior_pretty}\n\
                 Note: These are ALL assignments that were previously found anywhere in this course.\n"
            )
        };

        let prompt = format!(
            "Your job is to find homework assignments on this course webpage.\n\
             A student needs to know about deadlines for these assignments.\n\
             {prior_context}\n\
             For each assignment you find on this page, you must determine:\n\
             - If it matches any assignment in the \"Previously found assignments\" list above, mark it as repeated: true\n\
             - If it's a completely new assignment not in that list, mark it as repeated: false\n\n\
             IMPORTANT:\n\
             - An assignment is \"repeated\" if it appears to be the same assignment as one in the previous list\n\
             - Use your judgment to match assignments even if wording differs slightly\n\
             - Do not include due date details in the description\n\
             - Focus on the core assignment content, not formatting differences\n\n\
             Find ALL assignments mentioned on this page.\n\n\
             Page content:\n{content}"
        );

        let extraction: PageExtraction = self.claude.extract(SYSTEM_PROMPT, prompt).await?;

        debug!(
            found = extraction.assignments.len(),
            "Assignment extraction complete"
        );

        Ok(extraction.assignments)
    }
}
