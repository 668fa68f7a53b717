pub mod error;

pub use error::{BrowserlessError, Result};

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Navigation budget inside the browser. The HTTP call gets a few extra
/// seconds so the function can report a timeout instead of the socket dying.
const NAV_TIMEOUT_MS: u64 = 15_000;
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Realistic desktop fingerprint for sites that block obvious bots.
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Puppeteer script run by the Browserless /function endpoint. Sets the
/// fingerprint, clears the webdriver flag, navigates with a bounded
/// document-ready wait, and always closes the page before returning.
const PROBE_FUNCTION: &str = r#"
export default async function ({ page, context }) {
  try {
    await page.setUserAgent(context.userAgent);
    await page.setViewport({ width: 1366, height: 768 });
    await page.setExtraHTTPHeaders({ "Accept-Language": "en-US,en;q=0.9" });
    await page.evaluateOnNewDocument(() => {
      Object.defineProperty(navigator, "webdriver", { get: () => undefined });
    });

    const start = Date.now();
    const response = await page.goto(context.url, {
      waitUntil: "domcontentloaded",
      timeout: context.timeoutMs,
    });

    return {
      data: {
        status: response ? response.status() : null,
        elapsedMs: Date.now() - start,
      },
      type: "application/json",
    };
  } finally {
    await page.close();
  }
}
"#;

/// Outcome of one navigation probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// HTTP status of the main document, if navigation produced a response.
    pub status: Option<u16>,
    pub elapsed_ms: u64,
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Navigate to a URL in an isolated browser session and report the main
    /// document's status and latency. The session is torn down by the
    /// function's `finally` on every exit path, including navigation errors
    /// and timeouts.
    pub async fn probe(&self, url: &str) -> Result<ProbeOutcome> {
        let mut endpoint = format!("{}/function", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "code": PROBE_FUNCTION,
            "context": {
                "url": url,
                "userAgent": DESKTOP_USER_AGENT,
                "timeoutMs": NAV_TIMEOUT_MS,
            },
        });

        debug!(url, "Browserless navigation probe");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Navigation failures (DNS, timeout, refused) surface as a
            // non-2xx from /function with the puppeteer error in the body.
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}
