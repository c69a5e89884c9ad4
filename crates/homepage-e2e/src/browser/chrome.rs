//! Headless Chrome pages over the DevTools protocol.

use super::{CaptureSink, ClickOutcome, ClickPlan, Loaded, Node};
use crate::error::{CapturedError, Result, ScenarioError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::log::{self, EventEntryAdded, LogEntryLevel};
use chromiumoxide::cdp::browser_protocol::network::{self, EventResponseReceived};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EvaluateParams, EventConsoleApiCalled, EventExceptionThrown,
    RemoteObject,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// Time for events of the last action to reach the capture task
const SETTLE: Duration = Duration::from_millis(250);

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Element snapshot, evaluated in the page. Visible means a non-empty
/// layout box and a computed `visibility` that shows it.
const SNAPSHOT_JS: &str = r#"((scope, selector) => {
  const root = scope === null ? document : document.querySelector(scope);
  if (!root) return [];
  return Array.from(root.querySelectorAll(selector), (el) => {
    const style = getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return {
      tag: el.localName,
      text: el.textContent || "",
      attrs: Object.fromEntries(Array.from(el.attributes, (a) => [a.name, a.value])),
      visible: style.visibility !== "hidden" && style.visibility !== "collapse"
        && rect.width > 0 && rect.height > 0,
    };
  });
})"#;

/// Is a Chrome executable installed where chromiumoxide looks for one
/// (or named by `CHROME`)?
pub(super) fn available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| match config() {
        Ok(_) => true,
        Err(reason) => {
            info!(%reason, "Chrome not found");
            false
        }
    })
}

fn config() -> std::result::Result<BrowserConfig, String> {
    BrowserConfig::builder()
        .no_sandbox()
        .window_size(1280, 900)
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .build()
}

fn cdp_error(context: &str, err: CdpError) -> ScenarioError {
    ScenarioError::Browser {
        message: format!("{context}: {err}"),
    }
}

/// One Chrome process with one page. Dropping it closes the browser.
pub(super) struct ChromePage {
    base: Url,
    browser: Browser,
    page: Page,
    tasks: Vec<JoinHandle<()>>,
    // Last, so the browser is closed while the runtime is still alive
    runtime: Runtime,
}

impl ChromePage {
    pub(super) fn launch(base: Url, sink: CaptureSink) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| ScenarioError::Browser {
                message: format!("failed to start runtime: {e}"),
            })?;

        let (browser, page, tasks) = runtime.block_on(async {
            let config = config().map_err(|message| ScenarioError::Browser { message })?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| cdp_error("failed to launch Chrome", e))?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(err) = event {
                        debug!(error = %err, "DevTools handler");
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| cdp_error("failed to open a page", e))?;
            page.execute(log::EnableParams::default())
                .await
                .map_err(|e| cdp_error("failed to enable the log domain", e))?;
            page.execute(network::EnableParams::default())
                .await
                .map_err(|e| cdp_error("failed to enable the network domain", e))?;
            let capture = capture_errors(&page, sink)
                .await
                .map_err(|e| cdp_error("failed to subscribe to page events", e))?;

            Ok::<_, ScenarioError>((browser, page, vec![handler, capture]))
        })?;
        info!("Chrome page ready");

        Ok(Self {
            base,
            browser,
            page,
            tasks,
            runtime,
        })
    }

    fn evaluate<T: DeserializeOwned>(&self, expression: String) -> Result<T> {
        self.runtime.block_on(async {
            self.page
                .evaluate_expression(EvaluateParams::new(expression))
                .await
                .map_err(|e| cdp_error("evaluation failed", e))?
                .into_value::<T>()
                .map_err(|e| ScenarioError::Browser {
                    message: format!("unexpected evaluation result: {e}"),
                })
        })
    }

    fn settle(&self) {
        self.runtime.block_on(tokio::time::sleep(SETTLE));
    }

    fn loaded(&self) -> Result<Loaded> {
        let url = self.url()?;
        let status: u16 = self.evaluate(
            r#"(performance.getEntriesByType("navigation")[0] || {}).responseStatus || 0"#
                .to_string(),
        )?;
        Ok(Loaded {
            url,
            status: if status == 0 { 200 } else { status },
        })
    }

    pub(super) fn goto(&mut self, path: &str) -> Result<Loaded> {
        let url = self.base.join(path).map_err(|e| ScenarioError::Http {
            url: path.to_string(),
            message: e.to_string(),
        })?;
        self.runtime.block_on(async {
            match tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.goto(url.as_str())).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(err)) => Err(ScenarioError::Http {
                    url: url.to_string(),
                    message: err.to_string(),
                }),
                Err(_) => Err(ScenarioError::Http {
                    url: url.to_string(),
                    message: format!("navigation timed out after {NAVIGATION_TIMEOUT:?}"),
                }),
            }
        })?;
        self.settle();
        self.loaded()
    }

    pub(super) fn url(&self) -> Result<Url> {
        let href: String = self.evaluate("location.href".to_string())?;
        Url::parse(&href).map_err(|e| ScenarioError::Browser {
            message: format!("page reports an invalid URL {href:?}: {e}"),
        })
    }

    pub(super) fn title(&self) -> Result<String> {
        self.evaluate("document.title".to_string())
    }

    pub(super) fn query(&self, scope: Option<&str>, selector: &str) -> Result<Vec<Node>> {
        let scope = serde_json::to_string(&scope).unwrap_or_else(|_| "null".to_string());
        let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
        let nodes: Vec<Node> = self.evaluate(format!("{SNAPSHOT_JS}({scope}, {selector})"))?;
        Ok(nodes
            .into_iter()
            .map(|n| Node::new(n.tag, &n.text, n.attrs, n.visible))
            .collect())
    }

    pub(super) fn click(
        &mut self,
        selector: &str,
        index: usize,
        plan: ClickPlan,
    ) -> Result<ClickOutcome> {
        if plan == ClickPlan::Skip {
            return Ok(ClickOutcome::Skipped);
        }
        let route = self.url()?.path().to_string();
        self.runtime.block_on(async {
            let elements = self
                .page
                .find_elements(selector)
                .await
                .map_err(|e| cdp_error("element lookup failed", e))?;
            let element = elements.get(index).ok_or_else(|| ScenarioError::Navigation {
                route: route.clone(),
                detail: format!("no element #{index} matches {selector}"),
            })?;
            element.click().await.map_err(|e| ScenarioError::Navigation {
                route: route.clone(),
                detail: format!("click on {selector} #{index} failed: {e}"),
            })?;
            if let ClickPlan::Navigate(target) = &plan {
                tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.wait_for_navigation())
                    .await
                    .map_err(|_| ScenarioError::Http {
                        url: target.to_string(),
                        message: format!("navigation timed out after {NAVIGATION_TIMEOUT:?}"),
                    })?
                    .map_err(|e| ScenarioError::Http {
                        url: target.to_string(),
                        message: e.to_string(),
                    })?;
            }
            Ok::<_, ScenarioError>(())
        })?;
        self.settle();

        match plan {
            ClickPlan::Fragment { fragment, .. } => {
                let id = serde_json::to_string(&fragment).unwrap_or_else(|_| "\"\"".to_string());
                let found = fragment.is_empty()
                    || self.evaluate::<bool>(format!("document.getElementById({id}) !== null"))?;
                Ok(ClickOutcome::Scrolled { fragment, found })
            }
            ClickPlan::Navigate(_) => {
                let loaded = self.loaded()?;
                Ok(ClickOutcome::Navigated {
                    url: loaded.url,
                    status: loaded.status,
                })
            }
            ClickPlan::Skip => Ok(ClickOutcome::Skipped),
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        let browser = &mut self.browser;
        self.runtime.block_on(async {
            if browser.close().await.is_ok() {
                let _ = browser.wait().await;
            }
        });
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Forward console errors, uncaught exceptions, error log entries and
/// 4xx/5xx responses into `sink`, in arrival order.
async fn capture_errors(
    page: &Page,
    sink: CaptureSink,
) -> std::result::Result<JoinHandle<()>, CdpError> {
    let console = page.event_listener::<EventConsoleApiCalled>().await?;
    let exceptions = page.event_listener::<EventExceptionThrown>().await?;
    let entries = page.event_listener::<EventEntryAdded>().await?;
    let responses = page.event_listener::<EventResponseReceived>().await?;

    let streams: Vec<BoxStream<'static, Option<CapturedError>>> = vec![
        console
            .map(|event| {
                matches!(event.r#type, ConsoleApiCalledType::Error)
                    .then(|| CapturedError::Console(console_text(&event.args)))
            })
            .boxed(),
        exceptions
            .map(|event| {
                let details = &event.exception_details;
                let message = details
                    .exception
                    .as_ref()
                    .and_then(|e| e.description.clone())
                    .unwrap_or_else(|| details.text.clone());
                Some(CapturedError::Console(format!("Uncaught {message}")))
            })
            .boxed(),
        entries
            .map(|event| {
                matches!(event.entry.level, LogEntryLevel::Error)
                    .then(|| CapturedError::Console(event.entry.text.clone()))
            })
            .boxed(),
        responses
            .map(|event| {
                let status = u16::try_from(event.response.status).unwrap_or(0);
                (400..600).contains(&status).then(|| CapturedError::Network {
                    status,
                    url: event.response.url.clone(),
                })
            })
            .boxed(),
    ];

    let mut merged = stream::select_all(streams);
    Ok(tokio::spawn(async move {
        while let Some(captured) = merged.next().await {
            if let Some(error) = captured {
                sink.record(error);
            }
        }
    }))
}

/// Console arguments joined the way DevTools prints them
fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .map(|arg| match &arg.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => arg.description.clone().unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
