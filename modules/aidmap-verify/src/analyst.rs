use std::sync::Arc;

use ai_client::{Claude, Reply};
use aidmap_common::Suggestion;
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::checks::cross_reference::FoundOrganization;
use crate::search::{WebSearchTool, WebSearcher};

/// Verdict from the website content match.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentMatchVerdict {
    /// Whether the page plausibly belongs to the submitted organization.
    pub matches: bool,
    /// 0.0-1.0 confidence in the verdict.
    pub confidence: f64,
    /// Organization fields as they appear on the page, for conflict checks.
    pub found: FoundOrganization,
    pub reasoning: String,
}

/// The pipeline's LLM seam. Injected so tests run with doubles and tenants
/// can carry their own credentials.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Judge whether extracted page text belongs to the suggested org.
    async fn judge_content_match(
        &self,
        suggestion: &Suggestion,
        page_text: &str,
    ) -> Result<Reply<ContentMatchVerdict>>;

    /// Ask for the organization's official site when the submitted one is
    /// dead. Returns the raw model reply: one URL, or the "not found"
    /// sentinel.
    async fn find_official_url(
        &self,
        suggestion: &Suggestion,
        dead_url: &str,
    ) -> Result<Reply<String>>;

    /// Whether this analyst can run web searches (controls the auto-fixer).
    fn can_search(&self) -> bool;

    fn model(&self) -> &str;
    fn provider(&self) -> &'static str;
}

const CONTENT_MATCH_PROMPT: &str = r#"You verify community service directory entries.

You are given the fields of a submitted directory entry and the text content of
the website it claims as its own. Decide whether this page plausibly belongs to
the submitted organization.

- matches=true only if the page is about the same organization (name variants,
  DBA names, and parent-org pages count).
- A parked domain, an unrelated business, or a directory/aggregator listing is
  NOT a match.
- Report the organization fields exactly as they appear on the page in `found`
  (leave a field null when the page does not show it).
- confidence is your 0.0-1.0 confidence in the verdict either way."#;

const URL_FIX_PROMPT: &str = r#"You repair dead website links for a community services directory.

Use web_search to find the organization's OFFICIAL website. Rules:
- The official site only. Never a directory or aggregator page (211, FindHelp,
  Yelp, Yellow Pages, Facebook, LinkedIn, Google Maps links are all wrong).
- Reply with EXACTLY one URL and nothing else — no prose, no markdown.
- If you cannot find an official site, reply with exactly: not found"#;

/// Production analyst backed by Claude.
pub struct ClaudeAnalyst {
    claude: Claude,
    searcher: Option<Arc<dyn WebSearcher>>,
}

impl ClaudeAnalyst {
    pub fn new(claude: Claude, searcher: Option<Arc<dyn WebSearcher>>) -> Self {
        Self { claude, searcher }
    }

    fn describe(suggestion: &Suggestion) -> String {
        let mut lines = vec![format!("Name: {}", suggestion.name)];
        if let Some(address) = suggestion.full_address() {
            lines.push(format!("Address: {address}"));
        }
        if let Some(phone) = &suggestion.phone {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(email) = &suggestion.email {
            lines.push(format!("Email: {email}"));
        }
        if let Some(category) = &suggestion.category {
            lines.push(format!("Category: {category}"));
        }
        if !suggestion.services.is_empty() {
            lines.push(format!("Services: {}", suggestion.services.join(", ")));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Analyst for ClaudeAnalyst {
    async fn judge_content_match(
        &self,
        suggestion: &Suggestion,
        page_text: &str,
    ) -> Result<Reply<ContentMatchVerdict>> {
        let user_prompt = format!(
            "## Submitted entry\n{}\n\n## Website text\n{}",
            Self::describe(suggestion),
            page_text
        );

        self.claude.extract(CONTENT_MATCH_PROMPT, user_prompt).await
    }

    async fn find_official_url(
        &self,
        suggestion: &Suggestion,
        dead_url: &str,
    ) -> Result<Reply<String>> {
        let mut agent = self.claude.clone();
        if let Some(searcher) = &self.searcher {
            agent = agent.tool(WebSearchTool {
                searcher: searcher.clone(),
            });
        }

        let input = format!(
            "The listed website {dead_url} no longer responds.\n\n{}",
            Self::describe(suggestion)
        );

        agent
            .prompt(input)
            .preamble(URL_FIX_PROMPT)
            .temperature(0.0)
            .multi_turn(6)
            .send()
            .await
    }

    fn can_search(&self) -> bool {
        self.searcher.is_some()
    }

    fn model(&self) -> &str {
        self.claude.model()
    }

    fn provider(&self) -> &'static str {
        "anthropic"
    }
}
