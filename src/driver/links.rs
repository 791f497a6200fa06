use crate::core::Backend;
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use crate::types::{LinkHealth, LinkReport};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Existence check for one URL. Seam so the scanner is testable without a
/// network.
pub trait LinkProber: Send + Sync {
    /// HTTP status of a lightweight request, or a reason the endpoint could
    /// not be reached.
    fn probe(&self, url: &str) -> std::result::Result<u16, String>;
}

/// HEAD-request prober.
pub struct HttpProber {
    client: reqwest::blocking::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| DriverError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl LinkProber for HttpProber {
    fn probe(&self, url: &str) -> std::result::Result<u16, String> {
        self.client
            .head(url)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(|e| e.to_string())
    }
}

/// Best-effort broken-link diagnostic: every anchor on the page is probed and
/// classified; one unreachable link never stops the rest of the scan.
pub struct LinkScanner;

impl LinkScanner {
    pub fn scan<B: Backend>(
        session: &Session<B>,
        prober: &dyn LinkProber,
    ) -> Result<Vec<LinkReport>> {
        let map = session.expect_ok(
            "var anchors = __doc.querySelectorAll('a');\
             var hrefs = [];\
             for (var i = 0; i < anchors.length; i++) {\
               var raw = anchors[i].getAttribute('href');\
               hrefs.push(raw && raw.trim().length ? anchors[i].href : null);\
             }\
             return { ok: true, hrefs: hrefs };",
        )?;
        let hrefs: Vec<Option<String>> =
            serde_json::from_value(map.get("hrefs").cloned().unwrap_or(Value::Array(Vec::new())))?;

        let reports: Vec<LinkReport> = hrefs
            .into_iter()
            .map(|href| Self::classify(href, prober))
            .collect();
        let broken = reports.iter().filter(|r| r.is_broken()).count();
        info!(total = reports.len(), broken, "broken-link scan finished");
        Ok(reports)
    }

    fn classify(href: Option<String>, prober: &dyn LinkProber) -> LinkReport {
        let href = match href {
            None => return LinkReport { href: None, health: LinkHealth::Empty },
            Some(h) if h.trim().is_empty() => {
                return LinkReport { href: Some(h), health: LinkHealth::Empty }
            }
            Some(h) => h,
        };
        let health = match Url::parse(&href) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => match prober.probe(&href) {
                Ok(status) if status >= 400 => LinkHealth::Broken(Some(status)),
                Ok(status) => LinkHealth::Healthy(Some(status)),
                Err(reason) => {
                    debug!(href = %href, reason, "link probe failed");
                    LinkHealth::Broken(None)
                }
            },
            // mailto:, tel:, javascript: carry no probeable endpoint.
            Ok(_) => LinkHealth::Healthy(None),
            Err(_) => LinkHealth::Broken(None),
        };
        LinkReport {
            href: Some(href),
            health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_session;
    use serde_json::json;
    use std::collections::HashMap;

    struct StaticProber {
        statuses: HashMap<String, std::result::Result<u16, String>>,
    }

    impl LinkProber for StaticProber {
        fn probe(&self, url: &str) -> std::result::Result<u16, String> {
            self.statuses
                .get(url)
                .cloned()
                .unwrap_or(Err("unknown host".to_string()))
        }
    }

    fn prober(entries: &[(&str, std::result::Result<u16, String>)]) -> StaticProber {
        StaticProber {
            statuses: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn classifies_and_never_aborts() {
        let (session, state) = mock_session();
        state.stub(
            "hrefs: hrefs",
            json!({
                "ok": true,
                "hrefs": [
                    "https://ok.test/",
                    "https://gone.test/page",
                    null,
                    "https://down.test/",
                    "mailto:team@ok.test",
                ]
            }),
        );
        let prober = prober(&[
            ("https://ok.test/", Ok(200)),
            ("https://gone.test/page", Ok(404)),
            ("https://down.test/", Err("connection refused".to_string())),
        ]);

        let reports = LinkScanner::scan(&session, &prober).unwrap();
        assert_eq!(reports.len(), 5);
        assert_eq!(reports[0].health, LinkHealth::Healthy(Some(200)));
        assert_eq!(reports[1].health, LinkHealth::Broken(Some(404)));
        assert_eq!(reports[2].health, LinkHealth::Empty);
        assert_eq!(reports[3].health, LinkHealth::Broken(None));
        assert_eq!(reports[4].health, LinkHealth::Healthy(None));
    }

    #[test]
    fn blank_href_counts_as_empty() {
        let report = LinkScanner::classify(Some("   ".to_string()), &prober(&[]));
        assert_eq!(report.health, LinkHealth::Empty);
    }

    #[test]
    fn status_threshold_is_400() {
        let prober = prober(&[
            ("https://a.test/", Ok(399)),
            ("https://b.test/", Ok(400)),
        ]);
        assert_eq!(
            LinkScanner::classify(Some("https://a.test/".into()), &prober).health,
            LinkHealth::Healthy(Some(399))
        );
        assert_eq!(
            LinkScanner::classify(Some("https://b.test/".into()), &prober).health,
            LinkHealth::Broken(Some(400))
        );
    }
}
