use anyhow::Result;
use async_trait::async_trait;
use llm_client::Claude;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ORACLE_MODEL;

/// The single due-date verdict for one assignment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedDueDate {
    /// The due date in ISO-8601 form, or null if none was found.
    pub date: Option<String>,
    /// True if the date is explicitly stated, false if inferred.
    pub date_certain: bool,
    /// True if a specific time is given, false if just a date.
    pub time_certain: bool,
    /// Confidence score between 0 and 1.
    pub confidence: f32,
    /// Source pages (blob paths) where this due date was found.
    pub source_urls: Vec<String>,
    /// Explanation of how this due date was determined.
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DueDateAnswer {
    pub due_date: Option<ResolvedDueDate>,
}

/// Produces at most one due date for one assignment from the text of its
/// source pages.
#[async_trait]
pub trait DueDateOracle: Send + Sync {
    async fn resolve(
        &self,
        title: &str,
        description: &str,
        sources_text: &str,
    ) -> Result<Option<ResolvedDueDate>>;
}

pub struct ClaudeDueDateOracle {
    claude: Claude,
}

impl ClaudeDueDateOracle {
    pub fn new(api_key: &str) -> Self {
        Self {
            claude: Claude::new(api_key, ORACLE_MODEL),
        }
    }
}

const SYSTEM_PROMPT: &str =
    "You are an expert at extracting assignment due dates from course materials.";

#[async_trait]
impl DueDateOracle for ClaudeDueDateOracle {
    async fn resolve(
        &self,
        title: &str,
        description: &str,
        sources_text: &str,
    ) -> Result<Option<ResolvedDueDate>> {
        let prompt = format!(
            "You are analyzing course content to find the due date for ONE specific assignment.\n\n\
             ASSIGNMENT TO FIND DUE DATE FOR:\n\
             Title: {title}\n\
             Description: {description}\n\n\
             INSTRUCTIONS:\n\
             1. Find the most accurate due date for THIS SPECIFIC assignment\n\
             2. Look for explicit mentions of deadlines, due dates, or submission times\n\
             3. Consider calendar pages, syllabus sections, and assignment descriptions\n\
             4. If multiple dates are mentioned for this assignment, use the most authoritative one\n\
             5. Provide the due date in ISO-8601 form (or null), whether it is certain or inferred,\n\
                whether a specific time is mentioned, a confidence level, which source pages\n\
                mentioned it, and your reasoning\n\n\
             If you cannot find a due date for this assignment, return null for the date and explain why.\n\n\
             CONTENT FROM ASSIGNMENT'S SOURCE PAGES:\n{sources_text}\n\n\
             Return exactly ONE due date result for this assignment."
        );

        let answer: DueDateAnswer = self.claude.extract(SYSTEM_PROMPT, prompt).await?;

        debug!(
            title,
            found = answer.due_date.is_some(),
            "Due date resolution complete"
        );

        Ok(answer.due_date)
    }
}
