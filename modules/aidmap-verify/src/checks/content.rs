use std::time::Duration;

use ai_client::util::truncate_to_char_boundary;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Character budget for extracted page text, sized for LLM context.
pub const MAX_CONTENT_CHARS: usize = 5_000;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "aidmap-verify/0.1 (+https://aidmap.org/about/verification)";

/// Fetches raw HTML. `None` on any fetch failure or non-success status —
/// content extraction never faults the pipeline.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "Content fetch failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(url, status = %resp.status(), "Content fetch returned non-success");
            return None;
        }

        match resp.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "Content fetch body read failed");
                None
            }
        }
    }
}

/// Fetch a page and reduce it to plain text for downstream matching.
pub async fn extract_page_text(fetcher: &dyn PageFetcher, url: &str) -> Option<String> {
    let html = fetcher.fetch(url).await?;
    let text = extract_text(&html);

    if text.is_empty() {
        warn!(url, "Page produced no text after stripping");
        return None;
    }

    debug!(url, chars = text.len(), "Page text extracted");
    Some(text)
}

/// Strip scripts, styles, and markup from HTML and collapse the remainder
/// into a single whitespace-normalized string, truncated to
/// [`MAX_CONTENT_CHARS`].
pub fn extract_text(html: &str) -> String {
    let script_re = regex::Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex");
    let style_re = regex::Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex");
    let tag_re = regex::Regex::new(r"(?s)<[^>]+>").expect("valid regex");
    let ws_re = regex::Regex::new(r"\s+").expect("valid regex");

    let text = script_re.replace_all(html, " ");
    let text = style_re.replace_all(&text, " ");
    let text = tag_re.replace_all(&text, " ");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    let collapsed = ws_re.replace_all(&text, " ");
    truncate_to_char_boundary(collapsed.trim(), MAX_CONTENT_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_tags() {
        let html = r#"
            <html><head>
              <style>body { color: red; }</style>
              <script>window.alert("hi");</script>
            </head>
            <body>
              <h1>Oak Park Food Shelf</h1>
              <p>Open <b>Tuesdays</b> &amp; Thursdays</p>
            </body></html>
        "#;

        let text = extract_text(html);
        assert_eq!(text, "Oak Park Food Shelf Open Tuesdays & Thursdays");
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn multiline_script_blocks_are_removed() {
        let html = "<script>\nlet x = 1;\nlet y = 2;\n</script>before<p>after</p>";
        assert_eq!(extract_text(html), "before after");
    }

    #[test]
    fn truncates_to_budget() {
        let html = format!("<p>{}</p>", "word ".repeat(3_000));
        let text = extract_text(&html);
        assert!(text.len() <= MAX_CONTENT_CHARS);
    }

    #[test]
    fn empty_input_yields_empty() {
        assert_eq!(extract_text(""), "");
    }

    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Option<String> {
            self.0.map(String::from)
        }
    }

    #[tokio::test]
    async fn fetch_failure_yields_none() {
        assert!(
            extract_page_text(&StaticFetcher(None), "https://example.org")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn markup_only_page_yields_none() {
        let fetcher = StaticFetcher(Some("<div><span></span></div>"));
        assert!(extract_page_text(&fetcher, "https://example.org")
            .await
            .is_none());
    }
}
