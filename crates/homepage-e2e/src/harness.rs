//! Test harness for homepage end-to-end scenarios
//!
//! Provides a [`TestSite`] that either points at an already running site or
//! serves a directory (a built site or a fixture) from an in-process static
//! server, plus plain GET helpers and isolated [`Browser`] contexts. Every
//! error a browser context captures is also kept on the site, so reports
//! carry them even when the scenario passes or fails for another reason.
//!
//! # Environment Variables
//!
//! - `HOMEPAGE_RETRIES`: attempts per request on connection reset (default 5)
//! - `HOMEPAGE_BROWSER`: page engine, see [`Engine`]

use crate::browser::{Browser, CaptureSink, Engine};
use crate::dom::Document;
use crate::error::{CapturedError, Result, ScenarioError};
use crate::serve::StaticServer;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};
use url::Url;

/// Errors setting up a [`TestSite`]
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("invalid base URL {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL {0} must use http or https")]
    Scheme(String),

    #[error("site directory {} does not exist", .0.display())]
    MissingDir(PathBuf),

    #[error("failed to start static server: {0}")]
    Serve(#[from] std::io::Error),
}

#[derive(Clone)]
struct LogLine {
    ts: Duration,
    abs: SystemTime,
    line: String,
}

/// Harness events for one site, printed when a scenario fails
#[derive(Clone)]
pub struct SiteLog {
    lines: Arc<Mutex<Vec<LogLine>>>,
    start: Instant,
}

impl SiteLog {
    pub(crate) fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            start: Instant::now(),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let entry = LogLine {
            ts: self.start.elapsed(),
            abs: SystemTime::now(),
            line: line.into(),
        };
        self.lines.lock().unwrap().push(entry);
    }

    /// Rendered lines, oldest first
    pub fn render(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap().clone();
        lines
            .into_iter()
            .map(|l| {
                let abs = l
                    .abs
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_else(|_| Duration::from_secs(0));
                format!(
                    "{:>10}.{:03}Z {:>8.3}s {}",
                    abs.as_secs(),
                    abs.subsec_millis(),
                    l.ts.as_secs_f64(),
                    l.line
                )
            })
            .collect()
    }
}

/// Build the HTTP agent used by the harness and by browser contexts.
/// 4xx/5xx come back as responses, not errors.
pub(crate) fn http_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(30)))
        .build();
    config.into()
}

fn max_retries() -> usize {
    std::env::var("HOMEPAGE_RETRIES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(5)
        .max(1)
}

/// GET `url`, retrying connection resets, reading the body as text when
/// `read_body` is set.
pub(crate) fn fetch(
    agent: &ureq::Agent,
    log: &SiteLog,
    url: &Url,
    read_body: bool,
) -> Result<Response> {
    use ureq::ResponseExt;

    fn format_error_chain(err: &dyn std::error::Error) -> String {
        let mut out = err.to_string();
        let mut cur = err.source();
        while let Some(e) = cur {
            out.push_str("\n  caused by: ");
            out.push_str(&e.to_string());
            cur = e.source();
        }
        out
    }

    fn is_connection_reset(err: &ureq::Error) -> bool {
        match err {
            ureq::Error::Io(io) => {
                io.kind() == std::io::ErrorKind::ConnectionReset
                    || io.to_string().contains("Connection reset by peer")
                    || io.to_string().contains("os error 54")
            }
            _ => false,
        }
    }

    log.push(format!("[harness] GET {url}"));
    let max_retries = max_retries();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match agent.get(url.as_str()).call() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let final_url = Url::parse(&resp.get_uri().to_string()).unwrap_or_else(|_| url.clone());
                let content_type = resp
                    .headers()
                    .get(ureq::http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = if read_body {
                    resp.into_body().read_to_string().unwrap_or_default()
                } else {
                    String::new()
                };
                debug!(%url, status, "Received response");
                log.push(format!("[harness] {status} {final_url}"));
                return Ok(Response {
                    status,
                    body,
                    url: final_url.to_string(),
                    content_type,
                });
            }
            Err(e) => {
                log.push(format!(
                    "[harness] GET error attempt {attempt}/{max_retries}: {e}"
                ));
                if is_connection_reset(&e) && attempt < max_retries {
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }
                error!(%url, error = ?e, "GET failed");
                return Err(ScenarioError::Http {
                    url: url.to_string(),
                    message: format_error_chain(&e),
                });
            }
        }
    }
}

enum Target {
    Remote,
    /// Kept alive for the site's lifetime; dropping it stops the server
    Served { _server: StaticServer },
}

/// A site under test
pub struct TestSite {
    base: Url,
    agent: ureq::Agent,
    log: SiteLog,
    engine: Engine,
    captures: Arc<Mutex<Vec<CapturedError>>>,
    _target: Target,
}

impl TestSite {
    /// Target an already running site
    pub fn connect(base_url: &str) -> std::result::Result<Self, HarnessError> {
        let base = Url::parse(base_url).map_err(|source| HarnessError::BaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(HarnessError::Scheme(base.to_string()));
        }
        Ok(Self::with_target(base, Target::Remote))
    }

    /// Serve `dir` from an in-process static server
    pub fn serve_dir(dir: &Path) -> std::result::Result<Self, HarnessError> {
        if !dir.is_dir() {
            return Err(HarnessError::MissingDir(dir.to_path_buf()));
        }
        let server = StaticServer::start(dir)?;
        let base = Url::parse(&server.base_url()).map_err(|source| HarnessError::BaseUrl {
            url: server.base_url(),
            source,
        })?;
        let site = Self::with_target(base, Target::Served { _server: server });
        site.log
            .push(format!("[harness] serving {} at {}", dir.display(), site.base));
        Ok(site)
    }

    /// Serve one of this crate's fixture sites
    pub fn fixture(name: &str) -> Self {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name);
        Self::serve_dir(&dir).unwrap_or_else(|e| panic!("serve fixture {name}: {e}"))
    }

    fn with_target(base: Url, target: Target) -> Self {
        let engine = Engine::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "Ignoring HOMEPAGE_BROWSER");
            Engine::Auto
        });
        Self {
            base,
            agent: http_agent(),
            log: SiteLog::new(),
            engine,
            captures: Arc::new(Mutex::new(Vec::new())),
            _target: target,
        }
    }

    /// Use `engine` for the browser contexts this site opens
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Absolute URL for a site path
    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    pub fn log(&self) -> &SiteLog {
        &self.log
    }

    /// Make a GET request to a path
    pub fn get(&self, path: &str) -> Result<Response> {
        fetch(&self.agent, &self.log, &self.url(path), true)
    }

    /// Poll `path` until the site answers at all, or give up after `timeout`
    pub fn wait_until_up(&self, path: &str, timeout: Duration) -> Result<Response> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.get(path) {
                Ok(resp) => return Ok(resp),
                Err(err) if Instant::now() >= deadline => return Err(err),
                Err(_) => std::thread::sleep(Duration::from_millis(200)),
            }
        }
    }

    /// A fresh page context with its own error capture
    pub fn browser(&self) -> Result<Browser> {
        let sink = CaptureSink::new(self.captures.clone(), self.log.clone());
        Browser::open(self.base.clone(), self.engine, http_agent(), sink)
    }

    /// Every error any browser context of this site captured, in order
    pub fn captured(&self) -> Vec<CapturedError> {
        self.captures.lock().unwrap().clone()
    }
}

/// An HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub url: String,
    pub content_type: Option<String>,
}

impl Response {
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_none_or(|ct| ct.starts_with("text/html"))
    }

    pub fn document(&self) -> Document {
        Document::parse(&self.body)
    }

    /// Scenario-side status check
    pub fn expect_status(&self, route: &str, expected: u16) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ScenarioError::Routing {
                route: route.to_string(),
                expected,
                actual: self.status,
            })
        }
    }

    /// Assert the response is 200 OK
    pub fn assert_ok(&self) {
        self.assert_status(200);
    }

    pub fn assert_status(&self, expected: u16) {
        assert_eq!(
            self.status, expected,
            "Expected {expected} for {}, got {}",
            self.url, self.status
        );
    }

    /// Assert the response body contains a substring
    pub fn assert_contains(&self, needle: &str) {
        assert!(
            self.body.contains(needle),
            "Response body for {} does not contain '{}'\nActual body (first 500 chars): {}",
            self.url,
            needle,
            self.body.chars().take(500).collect::<String>()
        );
    }

    /// Assert the response body does NOT contain a substring
    pub fn assert_not_contains(&self, needle: &str) {
        assert!(
            !self.body.contains(needle),
            "Response body for {} should not contain '{}', but it does",
            self.url,
            needle
        );
    }
}
