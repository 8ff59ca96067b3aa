//! Contact harvesting: render a fixed page set per domain and extract
//! business email addresses.
//!
//! Each domain gets a shallow, fixed candidate-path list — this is not a
//! crawler. Pages are rendered through [`PageRenderer`] so script-generated
//! contact info is captured, gated by [`RobotsGate`], and throttled with a
//! fixed post-fetch delay. Per-page failures never abort a domain or the run.

mod emails;
mod render;
mod robots;

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, instrument, warn};

use leadscout_shared::{ContactRecord, Domain};

pub use emails::extract_emails;
pub use render::{BrowserRenderer, PageRenderer, visible_text};
pub use robots::RobotsGate;

/// Candidate paths probed on every domain, in order.
pub const CANDIDATE_PATHS: [&str; 5] = ["/", "/contact", "/contact-us", "/about", "/about-us"];

/// Resolved harvesting options.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Attempted fetches allowed per domain (robots-blocked paths don't count).
    pub max_pages_per_domain: usize,
    /// Delay of `1/rps` after every successful page fetch (0 disables).
    pub requests_per_second: f64,
}

/// Harvests contact emails from a set of domains.
pub struct Harvester<R: PageRenderer> {
    renderer: R,
    robots: RobotsGate,
    max_pages_per_domain: usize,
    fetch_delay: Duration,
}

impl<R: PageRenderer> Harvester<R> {
    pub fn new(renderer: R, robots: RobotsGate, options: HarvestOptions) -> Self {
        let fetch_delay = if options.requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / options.requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            renderer,
            robots,
            max_pages_per_domain: options.max_pages_per_domain,
            fetch_delay,
        }
    }

    /// Visit each domain's candidate pages and collect deduplicated contacts.
    #[instrument(skip_all, fields(domains = domains.len()))]
    pub async fn harvest(&self, domains: &[Domain]) -> Vec<ContactRecord> {
        let mut records = Vec::new();
        let mut pages_fetched = 0usize;
        let mut pages_blocked = 0usize;
        let mut pages_failed = 0usize;

        for domain in domains {
            let base = domain.root_url();
            let mut attempted = 0usize;

            for path in CANDIDATE_PATHS {
                if attempted >= self.max_pages_per_domain {
                    break;
                }
                let url = format!("{base}{path}");

                // Blocked paths consume no budget and incur no delay.
                if !self.robots.is_allowed(&url).await {
                    pages_blocked += 1;
                    continue;
                }
                attempted += 1;

                let html = match self.renderer.render(&url).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(%url, error = %e, "page render failed, skipping path");
                        pages_failed += 1;
                        continue;
                    }
                };
                pages_fetched += 1;

                let text = visible_text(&html);
                for email in extract_emails(&text) {
                    records.push(ContactRecord {
                        domain: domain.clone(),
                        page_url: url.clone(),
                        email,
                    });
                }

                if !self.fetch_delay.is_zero() {
                    tokio::time::sleep(self.fetch_delay).await;
                }
            }
        }

        let deduped = dedup_contacts(records);
        info!(
            domains = domains.len(),
            pages_fetched,
            pages_blocked,
            pages_failed,
            contacts = deduped.len(),
            "harvest complete"
        );
        deduped
    }
}

/// Deduplicate on `(domain, email)`, keeping the earliest-discovered
/// `page_url` for each pair.
pub fn dedup_contacts(records: Vec<ContactRecord>) -> Vec<ContactRecord> {
    let mut seen: HashSet<(Domain, String)> = HashSet::new();
    let mut unique = Vec::new();
    for record in records {
        let key = (record.domain.clone(), record.email.clone());
        if seen.insert(key) {
            unique.push(record);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use leadscout_shared::LeadScoutError;

    /// Test renderer serving canned HTML, recording every URL it is asked for.
    #[derive(Default)]
    struct StubRenderer {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubRenderer {
        fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for StubRenderer {
        async fn render(&self, url: &str) -> leadscout_shared::Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| LeadScoutError::Browser(format!("{url}: navigation failed")))
        }
    }

    fn domain(host: &str) -> Domain {
        Domain::from_url(host).unwrap()
    }

    fn options(max_pages: usize) -> HarvestOptions {
        HarvestOptions {
            max_pages_per_domain: max_pages,
            requests_per_second: 0.0,
        }
    }

    #[test]
    fn contact_dedup_keeps_earliest_page_url() {
        let a = ContactRecord {
            domain: domain("a.com"),
            page_url: "https://a.com/".into(),
            email: "info@a.com".into(),
        };
        let later = ContactRecord {
            page_url: "https://a.com/contact".into(),
            ..a.clone()
        };
        let other = ContactRecord {
            domain: domain("a.com"),
            page_url: "https://a.com/contact".into(),
            email: "sales@a.com".into(),
        };

        let deduped = dedup_contacts(vec![a.clone(), later, other.clone()]);
        assert_eq!(deduped, vec![a, other]);
    }

    #[tokio::test]
    async fn harvests_emails_across_candidate_pages() {
        let renderer = StubRenderer::default()
            .with_page(
                "https://a.com/",
                "<html><body>Welcome! Mail info@a.com</body></html>",
            )
            .with_page(
                "https://a.com/contact",
                "<html><body>info@a.com or sales@a.com</body></html>",
            )
            .with_page("https://a.com/contact-us", "<html><body>nothing</body></html>");

        let harvester = Harvester::new(renderer, RobotsGate::disabled(), options(3));
        let records = harvester.harvest(&[domain("a.com")]).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].email, "info@a.com");
        assert_eq!(records[0].page_url, "https://a.com/");
        assert_eq!(records[1].email, "sales@a.com");
        assert_eq!(records[1].page_url, "https://a.com/contact");
    }

    #[tokio::test]
    async fn page_budget_counts_attempts_including_failures() {
        // Only the root page exists; /contact fails to render.
        let renderer = StubRenderer::default().with_page(
            "https://a.com/",
            "<html><body>info@a.com</body></html>",
        );

        let harvester = Harvester::new(renderer, RobotsGate::disabled(), options(2));
        let records = harvester.harvest(&[domain("a.com")]).await;

        // Two attempts consumed the budget; /contact-us was never tried.
        assert_eq!(
            harvester.renderer.calls(),
            vec!["https://a.com/", "https://a.com/contact"]
        );
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn robots_blocked_domain_consumes_no_budget() {
        let renderer = StubRenderer::default().with_page(
            "https://open.com/",
            "<html><body>hello@open.com</body></html>",
        );

        let robots = RobotsGate::new("test-agent").unwrap();
        robots.seed("https://blocked.com", false).await;
        robots.seed("https://open.com", true).await;

        let harvester = Harvester::new(renderer, robots, options(1));
        let records = harvester
            .harvest(&[domain("blocked.com"), domain("open.com")])
            .await;

        // The blocked domain never reached the renderer.
        assert_eq!(harvester.renderer.calls(), vec!["https://open.com/"]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "hello@open.com");
    }

    #[tokio::test]
    async fn render_failures_never_abort_the_run() {
        // No pages at all: every render fails, harvest still completes.
        let renderer = StubRenderer::default();
        let harvester = Harvester::new(renderer, RobotsGate::disabled(), options(5));
        let records = harvester
            .harvest(&[domain("a.com"), domain("b.com")])
            .await;
        assert!(records.is_empty());
        assert_eq!(harvester.renderer.calls().len(), 10);
    }

    #[tokio::test]
    async fn free_webmail_addresses_are_discarded() {
        let renderer = StubRenderer::default().with_page(
            "https://a.com/",
            "<html><body>owner@gmail.com and contact@a.com</body></html>",
        );

        let harvester = Harvester::new(renderer, RobotsGate::disabled(), options(1));
        let records = harvester.harvest(&[domain("a.com")]).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "contact@a.com");
    }
}
