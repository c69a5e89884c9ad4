//! Page contexts: navigation, DOM queries, clicks and error capture
//!
//! A [`Browser`] is one isolated page. By default it drives headless Chrome
//! through chromiumoxide: navigation goes through the real browser, console
//! `error` calls, uncaught exceptions and "Failed to load resource" log
//! entries become [`CapturedError::Console`], and every 4xx/5xx response
//! becomes [`CapturedError::Network`]. Visibility is the browser's computed
//! layout.
//!
//! Where Chrome is not installed the static engine stands in: it fetches
//! documents and same-origin subresources over HTTP and evaluates
//! visibility from markup alone (see [`Engine::Static`]).
//!
//! # Environment Variables
//!
//! - `HOMEPAGE_BROWSER`: `auto` (default), `chrome` or `static`
//! - `CHROME`: path to the Chrome/Chromium executable

mod chrome;
mod fallback;

use crate::error::{CapturedError, Result, ScenarioError};
use crate::harness::SiteLog;
use crate::selector::Selector;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

use chrome::ChromePage;
use fallback::StaticPage;

/// Which page engine to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Chrome when it can be launched, the static engine otherwise
    #[default]
    Auto,
    /// Headless Chrome; failing to launch it is an error
    Chrome,
    /// HTTP fetches plus parsed HTML. Scripts never run and stylesheets
    /// are not applied, so only markup-level hiding is seen.
    Static,
}

impl Engine {
    /// `HOMEPAGE_BROWSER`, or [`Engine::Auto`] when unset
    pub fn from_env() -> std::result::Result<Self, UnknownEngine> {
        match std::env::var("HOMEPAGE_BROWSER") {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::Auto),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown browser engine {0:?} (expected auto, chrome or static)")]
pub struct UnknownEngine(String);

impl FromStr for Engine {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "chrome" | "chromium" => Ok(Self::Chrome),
            "static" => Ok(Self::Static),
            _ => Err(UnknownEngine(s.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Chrome => "chrome",
            Self::Static => "static",
        })
    }
}

/// Can [`Engine::Chrome`] find a browser to launch?
pub fn chrome_available() -> bool {
    !CHROME_UNUSABLE.load(Ordering::Relaxed) && chrome::available()
}

/// Set once an automatic Chrome launch has failed, so later pages go
/// straight to the static engine.
static CHROME_UNUSABLE: AtomicBool = AtomicBool::new(false);

/// Records captured errors for one page and for the site that opened it
#[derive(Clone)]
pub(crate) struct CaptureSink {
    page: Arc<Mutex<Vec<CapturedError>>>,
    site: Arc<Mutex<Vec<CapturedError>>>,
    log: SiteLog,
}

impl CaptureSink {
    pub(crate) fn new(site: Arc<Mutex<Vec<CapturedError>>>, log: SiteLog) -> Self {
        Self {
            page: Arc::new(Mutex::new(Vec::new())),
            site,
            log,
        }
    }

    pub(crate) fn record(&self, error: CapturedError) {
        debug!(%error, "Page error");
        self.log.push(format!("[page] {error}"));
        self.site.lock().unwrap().push(error.clone());
        self.page.lock().unwrap().push(error);
    }

    pub(crate) fn log(&self) -> &SiteLog {
        &self.log
    }

    fn len(&self) -> usize {
        self.page.lock().unwrap().len()
    }

    fn since(&self, mark: usize) -> Vec<CapturedError> {
        self.page
            .lock()
            .unwrap()
            .get(mark..)
            .map(<[_]>::to_vec)
            .unwrap_or_default()
    }
}

/// The "Failed to load resource" console message browsers log for a 4xx/5xx
pub(crate) fn failed_load_message(status: u16) -> String {
    let reason = ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    format!("Failed to load resource: the server responded with a status of {status} ({reason})")
}

/// A snapshot of one matched element
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    /// Lowercase tag name
    pub tag: String,
    text: String,
    attrs: BTreeMap<String, String>,
    pub visible: bool,
}

impl Node {
    pub(crate) fn new(
        tag: String,
        text: &str,
        attrs: BTreeMap<String, String>,
        visible: bool,
    ) -> Self {
        Self {
            tag,
            text: collapse_whitespace(text),
            attrs,
            visible,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Text content with whitespace runs collapsed to one space
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text.contains(&collapse_whitespace(needle))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where the last navigation ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub url: Url,
    pub status: u16,
}

/// What a click did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Same-document fragment link; `found` tells whether the target exists
    Scrolled { fragment: String, found: bool },
    /// Loaded a new document
    Navigated { url: Url, status: u16 },
    /// Cross-origin or non-HTTP link, not followed
    Skipped,
}

enum Driver {
    Chrome(Box<ChromePage>),
    Static(StaticPage),
}

/// One isolated page with its own capture buffer
pub struct Browser {
    driver: Driver,
    sink: CaptureSink,
    /// Start of the capture window in the page's error list
    mark: Option<usize>,
}

impl Browser {
    pub(crate) fn open(
        base: Url,
        engine: Engine,
        agent: ureq::Agent,
        sink: CaptureSink,
    ) -> Result<Self> {
        let driver = match engine {
            Engine::Static => Driver::Static(StaticPage::new(base, agent, sink.clone())),
            Engine::Chrome => Driver::Chrome(Box::new(ChromePage::launch(base, sink.clone())?)),
            Engine::Auto if CHROME_UNUSABLE.load(Ordering::Relaxed) || !chrome::available() => {
                Driver::Static(StaticPage::new(base, agent, sink.clone()))
            }
            Engine::Auto => match ChromePage::launch(base.clone(), sink.clone()) {
                Ok(page) => Driver::Chrome(Box::new(page)),
                Err(err) => {
                    warn!(error = %err, "Chrome did not start, using the static engine");
                    CHROME_UNUSABLE.store(true, Ordering::Relaxed);
                    Driver::Static(StaticPage::new(base, agent, sink.clone()))
                }
            },
        };
        Ok(Self {
            driver,
            sink,
            mark: None,
        })
    }

    /// The engine actually driving this page
    pub fn engine(&self) -> Engine {
        match self.driver {
            Driver::Chrome(_) => Engine::Chrome,
            Driver::Static(_) => Engine::Static,
        }
    }

    /// Open the capture window: [`Browser::captured`] reports errors from
    /// here on. Errors before it still reach the site's capture list.
    pub fn start_capture(&mut self) {
        if self.mark.is_none() {
            self.mark = Some(self.sink.len());
        }
    }

    /// Errors recorded since [`Browser::start_capture`], in order
    pub fn captured(&self) -> Vec<CapturedError> {
        match self.mark {
            Some(mark) => self.sink.since(mark),
            None => Vec::new(),
        }
    }

    /// Navigate to a site path (or absolute URL)
    pub fn goto(&mut self, path: &str) -> Result<Loaded> {
        match &mut self.driver {
            Driver::Chrome(page) => page.goto(path),
            Driver::Static(page) => page.goto(path),
        }
    }

    /// URL of the current document
    pub fn url(&self) -> Result<Url> {
        match &self.driver {
            Driver::Chrome(page) => page.url(),
            Driver::Static(page) => page.url(),
        }
    }

    pub fn title(&self) -> Result<String> {
        match &self.driver {
            Driver::Chrome(page) => page.title(),
            Driver::Static(page) => page.title(),
        }
    }

    /// Every element matching `selector`, in document order
    pub fn query(&self, selector: &str) -> Result<Vec<Node>> {
        self.query_in(None, selector)
    }

    /// Elements matching `selector` inside the first `scope` match. No
    /// scope element means no matches.
    pub fn query_within(&self, scope: &str, selector: &str) -> Result<Vec<Node>> {
        self.query_in(Some(scope), selector)
    }

    fn query_in(&self, scope: Option<&str>, selector: &str) -> Result<Vec<Node>> {
        if let Some(scope) = scope {
            Selector::parse(scope)?;
        }
        Selector::parse(selector)?;
        match &self.driver {
            Driver::Chrome(page) => page.query(scope, selector),
            Driver::Static(page) => page.query(scope, selector),
        }
    }

    /// Click the `index`-th element matching `selector`
    pub fn click(&mut self, selector: &str, index: usize) -> Result<ClickOutcome> {
        Selector::parse(selector)?;
        let current = self.url()?;
        let node = self
            .query(selector)?
            .into_iter()
            .nth(index)
            .ok_or_else(|| ScenarioError::Navigation {
                route: current.path().to_string(),
                detail: format!("no element #{index} matches {selector}"),
            })?;
        let href = node.attr("href").unwrap_or_default();
        let target = current.join(href).map_err(|e| ScenarioError::Navigation {
            route: current.path().to_string(),
            detail: format!("cannot resolve href {href:?}: {e}"),
        })?;
        let plan = ClickPlan::new(&current, target);
        debug!(%selector, index, %href, ?plan, "Click");

        match &mut self.driver {
            Driver::Chrome(page) => page.click(selector, index, plan),
            Driver::Static(page) => page.click(plan),
        }
    }
}

/// What following a link's href means relative to the current document
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClickPlan {
    Fragment { target: Url, fragment: String },
    Navigate(Url),
    Skip,
}

impl ClickPlan {
    fn new(current: &Url, target: Url) -> Self {
        if !matches!(target.scheme(), "http" | "https") || target.origin() != current.origin() {
            return Self::Skip;
        }
        let mut without_fragment = target.clone();
        without_fragment.set_fragment(None);
        let mut current_without_fragment = current.clone();
        current_without_fragment.set_fragment(None);

        match target.fragment() {
            Some(fragment) if without_fragment == current_without_fragment => Self::Fragment {
                fragment: fragment.to_string(),
                target,
            },
            _ => Self::Navigate(target),
        }
    }
}
