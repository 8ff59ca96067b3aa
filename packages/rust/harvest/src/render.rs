//! Page rendering behind a trait seam.
//!
//! Contact pages are frequently script-generated, so harvesting renders each
//! page in a real browser ([`BrowserRenderer`], chromiumoxide) instead of
//! fetching raw HTML. Tests substitute a stub renderer.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use scraper::{ElementRef, Html};
use tokio::task::JoinHandle;
use tracing::debug;

use leadscout_shared::{LeadScoutError, Result};

/// Navigation timeout per page.
const NAV_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Loads a URL and returns the post-render HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// BrowserRenderer
// ---------------------------------------------------------------------------

/// Headless-browser renderer that executes client-side scripts.
pub struct BrowserRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    user_agent: String,
}

impl BrowserRenderer {
    /// Launch a headless browser instance.
    pub async fn launch(user_agent: &str) -> Result<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .build()
            .map_err(LeadScoutError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| LeadScoutError::Browser(e.to_string()))?;

        // Drive the CDP event stream for the life of the browser.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler_task,
            user_agent: user_agent.to_string(),
        })
    }

    /// Shut the browser down.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| LeadScoutError::Browser(format!("{url}: new page: {e}")))?;

        if let Err(e) = page.set_user_agent(self.user_agent.as_str()).await {
            debug!(url, error = %e, "user-agent override failed");
        }

        let navigate = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        };

        let result = match tokio::time::timeout(NAV_TIMEOUT, navigate).await {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(LeadScoutError::Browser(format!("{url}: {e}"))),
            Err(_) => Err(LeadScoutError::Browser(format!("{url}: navigation timeout"))),
        };

        let _ = page.close().await;
        result
    }
}

// ---------------------------------------------------------------------------
// Visible text
// ---------------------------------------------------------------------------

/// Extract the visible text from rendered HTML, skipping script, style, and
/// noscript subtrees.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    collect_text(doc.root_element(), &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push(' ');
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            match child_el.value().name() {
                "script" | "style" | "noscript" => {}
                _ => collect_text(child_el, out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_script_and_style() {
        let html = r#"<html><head>
            <style>body { color: red; }</style>
            <script>var hidden = "script@internal.com";</script>
        </head><body>
            <h1>Contact Us</h1>
            <p>Reach us at <a href="mailto:info@acme.com">info@acme.com</a></p>
            <noscript>Enable JS to see noscript@acme.com</noscript>
        </body></html>"#;

        let text = visible_text(html);
        assert!(text.contains("Contact Us"));
        assert!(text.contains("info@acme.com"));
        assert!(!text.contains("script@internal.com"));
        assert!(!text.contains("noscript@acme.com"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn visible_text_joins_fragments_with_spaces() {
        let html = "<html><body><div>sales</div><div>@acme.com</div></body></html>";
        let text = visible_text(html);
        // Separate elements must not concatenate into a fake token.
        assert!(text.contains("sales @acme.com"));
    }
}
