//! The static engine: documents and subresources fetched over HTTP,
//! queried as parsed HTML. Failed loads are reported the way a browser
//! reports them, as a 4xx/5xx network response plus a "Failed to load
//! resource" console error.

use super::{CaptureSink, ClickOutcome, ClickPlan, Loaded, Node, failed_load_message};
use crate::dom::{Document, Element};
use crate::error::{CapturedError, Result, ScenarioError};
use crate::harness::{SiteLog, fetch};
use std::collections::HashSet;
use url::Url;

/// Subresources a browser loads while rendering a page
const SUBRESOURCES: &[(&str, &str)] = &[
    ("script[src]", "src"),
    ("link[rel~=stylesheet][href]", "href"),
    ("link[rel~=icon][href]", "href"),
    ("link[rel=modulepreload][href]", "href"),
    ("img[src]", "src"),
];

struct Current {
    url: Url,
    document: Document,
}

pub(super) struct StaticPage {
    base: Url,
    agent: ureq::Agent,
    sink: CaptureSink,
    current: Option<Current>,
    /// Subresources that already loaded fine in this context
    cached: HashSet<Url>,
}

impl StaticPage {
    pub(super) fn new(base: Url, agent: ureq::Agent, sink: CaptureSink) -> Self {
        Self {
            base,
            agent,
            sink,
            current: None,
            cached: HashSet::new(),
        }
    }

    fn log(&self) -> &SiteLog {
        self.sink.log()
    }

    fn current(&self) -> Result<&Current> {
        self.current.as_ref().ok_or_else(no_page)
    }

    pub(super) fn goto(&mut self, path: &str) -> Result<Loaded> {
        let url = self.base.join(path).map_err(|e| ScenarioError::Http {
            url: path.to_string(),
            message: e.to_string(),
        })?;
        self.navigate(url)
    }

    fn navigate(&mut self, url: Url) -> Result<Loaded> {
        let resp = fetch(&self.agent, self.log(), &url, true)?;
        let final_url = Url::parse(&resp.url).unwrap_or(url);
        if resp.status >= 400 {
            self.record_failed_load(resp.status, &final_url);
        }
        let document = if resp.is_html() {
            resp.document()
        } else {
            Document::parse("")
        };
        let loaded = Loaded {
            url: final_url.clone(),
            status: resp.status,
        };
        self.current = Some(Current {
            url: final_url,
            document,
        });
        self.load_subresources();
        Ok(loaded)
    }

    fn load_subresources(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        let mut urls = Vec::new();
        for (selector, attr) in SUBRESOURCES {
            let Ok(elements) = current.document.select(selector) else {
                continue;
            };
            for el in elements {
                let Some(value) = el.attr(attr) else {
                    continue;
                };
                let Ok(url) = current.url.join(value) else {
                    continue;
                };
                if url.origin() == current.url.origin() && !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        for url in urls {
            if self.cached.contains(&url) {
                continue;
            }
            match fetch(&self.agent, self.log(), &url, false) {
                Ok(resp) if resp.status < 400 => {
                    self.cached.insert(url);
                }
                Ok(resp) => self.record_failed_load(resp.status, &url),
                Err(err) => self
                    .sink
                    .record(CapturedError::Console(format!("Failed to load resource: {err}"))),
            }
        }
    }

    fn record_failed_load(&self, status: u16, url: &Url) {
        self.sink.record(CapturedError::Network {
            status,
            url: url.to_string(),
        });
        self.sink
            .record(CapturedError::Console(failed_load_message(status)));
    }

    pub(super) fn url(&self) -> Result<Url> {
        Ok(self.current()?.url.clone())
    }

    pub(super) fn title(&self) -> Result<String> {
        Ok(self.current()?.document.title().unwrap_or_default())
    }

    pub(super) fn query(&self, scope: Option<&str>, selector: &str) -> Result<Vec<Node>> {
        let document = &self.current()?.document;
        let elements = match scope {
            None => document.select(selector)?,
            Some(scope) => match document.first(scope)? {
                Some(root) => root.select(selector)?,
                None => Vec::new(),
            },
        };
        Ok(elements.into_iter().map(snapshot).collect())
    }

    pub(super) fn click(&mut self, plan: ClickPlan) -> Result<ClickOutcome> {
        match plan {
            ClickPlan::Skip => Ok(ClickOutcome::Skipped),
            ClickPlan::Fragment { target, fragment } => {
                let current = self.current.as_mut().ok_or_else(no_page)?;
                let found = fragment.is_empty() || current.document.by_id(&fragment).is_some();
                current.url = target;
                Ok(ClickOutcome::Scrolled { fragment, found })
            }
            ClickPlan::Navigate(target) => {
                let loaded = self.navigate(target)?;
                Ok(ClickOutcome::Navigated {
                    url: loaded.url,
                    status: loaded.status,
                })
            }
        }
    }
}

fn no_page() -> ScenarioError {
    ScenarioError::Navigation {
        route: "(none)".to_string(),
        detail: "no page has been loaded".to_string(),
    }
}

fn snapshot(el: Element<'_>) -> Node {
    let attrs = el
        .attrs()
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Node::new(el.name().to_string(), &el.text(), attrs, el.is_visible())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Browser, Engine};
    use crate::harness::TestSite;
    use std::fs;

    fn site(files: &[(&str, &str)]) -> (tempfile::TempDir, TestSite) {
        let dir = tempfile::Builder::new()
            .prefix("homepage-browser-")
            .tempdir()
            .expect("create temp dir");
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let site = TestSite::serve_dir(dir.path())
            .unwrap()
            .with_engine(Engine::Static);
        (dir, site)
    }

    fn open(site: &TestSite) -> Browser {
        let browser = site.browser().unwrap();
        assert_eq!(browser.engine(), Engine::Static);
        browser
    }

    #[test]
    fn failures_before_capture_reach_only_the_site() {
        let (_dir, site) = site(&[(
            "index.html",
            r#"<html><head><script src="/missing.js"></script></head><body></body></html>"#,
        )]);
        let mut browser = open(&site);
        browser.goto("/").unwrap();
        assert!(browser.captured().is_empty());
        assert_eq!(site.captured().len(), 2);

        browser.start_capture();
        browser.goto("/").unwrap();
        let captured = browser.captured();
        assert_eq!(captured.len(), 2, "{captured:?}");
        assert!(matches!(&captured[0], CapturedError::Network { status: 404, url } if url.ends_with("/missing.js")));
        assert!(matches!(&captured[1], CapturedError::Console(m) if m.contains("404 (Not Found)")));
        assert_eq!(site.captured().len(), 4);
    }

    #[test]
    fn fragment_click_stays_on_page() {
        let (_dir, site) = site(&[(
            "index.html",
            r##"<html><body><a href="#about">About</a><a href="#nowhere">Gone</a><section id="about"></section></body></html>"##,
        )]);
        let mut browser = open(&site);
        browser.goto("/").unwrap();
        browser.start_capture();

        let outcome = browser.click("a", 0).unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Scrolled {
                fragment: "about".to_string(),
                found: true
            }
        );
        let outcome = browser.click("a", 1).unwrap();
        assert!(matches!(outcome, ClickOutcome::Scrolled { found: false, .. }));
        assert_eq!(browser.url().unwrap().path(), "/");
        assert!(browser.captured().is_empty());
    }

    #[test]
    fn path_click_navigates_and_records_failures() {
        let (_dir, site) = site(&[
            (
                "index.html",
                r#"<html><body><a href="/blog">Blog</a><a href="/gone">Gone</a></body></html>"#,
            ),
            ("blog/index.html", "<html><body><main>Posts</main></body></html>"),
        ]);
        let mut browser = open(&site);
        browser.goto("/").unwrap();
        browser.start_capture();

        match browser.click("a", 0).unwrap() {
            ClickOutcome::Navigated { status, .. } => assert_eq!(status, 200),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(browser.captured().is_empty());
        assert_eq!(browser.query("main").unwrap()[0].text(), "Posts");

        browser.goto("/").unwrap();
        match browser.click("a", 1).unwrap() {
            ClickOutcome::Navigated { status, .. } => assert_eq!(status, 404),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(browser.captured().iter().any(CapturedError::is_network));
    }

    #[test]
    fn external_links_are_skipped() {
        let (_dir, site) = site(&[(
            "index.html",
            r#"<html><body><a href="https://www.linkedin.com/">In</a><a href="mailto:hi@example.com">Mail</a></body></html>"#,
        )]);
        let mut browser = open(&site);
        browser.goto("/").unwrap();
        assert_eq!(browser.click("a", 0).unwrap(), ClickOutcome::Skipped);
        assert_eq!(browser.click("a", 1).unwrap(), ClickOutcome::Skipped);
    }

    #[test]
    fn queries_snapshot_markup_visibility() {
        let (_dir, site) = site(&[(
            "index.html",
            r#"<html><head><title>Markus Smet | HomePage</title></head><body>
                <footer><a href="/privacy">Privacy
                   Policy</a></footer>
                <section id="about" hidden>About</section>
            </body></html>"#,
        )]);
        let mut browser = open(&site);
        browser.goto("/").unwrap();
        assert_eq!(browser.title().unwrap(), "Markus Smet | HomePage");

        let links = browser.query_within("footer", "a").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text(), "Privacy Policy");
        assert_eq!(links[0].attr("href"), Some("/privacy"));
        assert!(links[0].visible);

        assert!(!browser.query("#about").unwrap()[0].visible);
        assert!(browser.query_within("aside", "a").unwrap().is_empty());
        assert!(browser.query("a[").is_err());
    }

    #[test]
    fn click_without_page_is_an_error() {
        let (_dir, site) = site(&[("index.html", "<html></html>")]);
        let mut browser = open(&site);
        assert!(browser.click("a", 0).is_err());
    }
}
