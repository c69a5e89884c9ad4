//! Running scenarios one at a time and collecting what happened.

use crate::browser::Engine;
use crate::checklist::Expectations;
use crate::error::CapturedError;
use crate::harness::{HarnessError, TestSite};
use crate::scenarios::Scenario;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Where the site under test lives
#[derive(Debug, Clone)]
pub enum SiteTarget {
    /// An already running site
    Remote(String),
    /// A directory served by the in-process static server
    Dir(PathBuf),
}

impl SiteTarget {
    /// A fresh [`TestSite`] handle for one scenario
    pub fn open(&self, engine: Engine) -> Result<TestSite, HarnessError> {
        let site = match self {
            Self::Remote(url) => TestSite::connect(url)?,
            Self::Dir(dir) => TestSite::serve_dir(dir)?,
        };
        Ok(site.with_engine(engine))
    }
}

#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(String),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// The result of one scenario run
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
    /// Every page error the scenario's browser contexts captured, in
    /// capture order, whatever the outcome
    pub captured: Vec<CapturedError>,
    /// Harness log lines for the site the scenario ran against
    pub logs: Vec<String>,
}

impl ScenarioReport {
    fn new(name: String, start: Instant) -> Self {
        Self {
            name,
            outcome: Outcome::Passed,
            elapsed: start.elapsed(),
            captured: Vec::new(),
            logs: Vec::new(),
        }
    }
}

/// Run `scenario` against a fresh site handle whose pages use `engine`.
/// Panics inside the scenario fail it instead of unwinding into the caller.
pub fn run_scenario(
    scenario: &Scenario,
    target: &SiteTarget,
    engine: Engine,
    expectations: &Expectations,
) -> ScenarioReport {
    let name = scenario.full_name();
    let start = Instant::now();

    let site = match target.open(engine) {
        Ok(site) => site,
        Err(err) => {
            warn!(scenario = %name, error = %err, "Could not open site");
            let mut report = ScenarioReport::new(name, start);
            report.outcome = Outcome::Failed(err.to_string());
            return report;
        }
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| scenario.run(&site, expectations)));
    let mut report = ScenarioReport::new(name, start);
    report.logs = site.log().render();
    report.captured = site.captured();

    match result {
        Ok(Ok(())) => {
            info!(scenario = %report.name, elapsed = ?report.elapsed, "Passed");
        }
        Ok(Err(err)) => {
            report.outcome = Outcome::Failed(err.to_string());
        }
        Err(payload) => {
            report.outcome = Outcome::Failed(panic_message(&payload));
        }
    }
    report
}

pub fn panic_message(e: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = e.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScenarioError;
    use crate::scenarios::{ScenarioFn, homepage};

    fn scenario(name: &'static str, func: ScenarioFn) -> Scenario {
        Scenario {
            name,
            module: "runner",
            func,
        }
    }

    fn fixture(name: &str) -> SiteTarget {
        SiteTarget::Dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name))
    }

    fn run(scenario: &Scenario, target: &SiteTarget) -> ScenarioReport {
        run_scenario(scenario, target, Engine::Static, &Expectations::default())
    }

    #[test]
    fn panics_fail_only_the_scenario() {
        let boom = scenario("boom", |_, _| panic!("boom"));
        let report = run(&boom, &fixture("personal-site"));
        assert!(matches!(&report.outcome, Outcome::Failed(msg) if msg == "boom"));
        assert_eq!(report.name, "runner::boom");
    }

    #[test]
    fn captures_come_from_the_site_not_the_error() {
        let failing = scenario("failing", |site, _| {
            let mut browser = site.browser()?;
            browser.goto("/nowhere")?;
            Err(ScenarioError::Content {
                route: "/nowhere".to_string(),
                detail: "wrong page".to_string(),
            })
        });
        let report = run(&failing, &fixture("personal-site"));
        assert!(!report.outcome.is_passed());
        assert!(report.captured.iter().any(
            |e| matches!(e, CapturedError::Network { status: 404, url } if url.ends_with("/nowhere"))
        ));
    }

    #[test]
    fn passing_scenarios_still_report_captured_errors() {
        let header = scenario("header_visible", homepage::header_visible);
        let report = run(&header, &fixture("template-site"));
        assert!(report.outcome.is_passed(), "{:?}", report.outcome);
        assert!(report.captured.iter().any(
            |e| matches!(e, CapturedError::Network { status: 404, url } if url.ends_with("/js/missing.js"))
        ));
        assert!(report.logs.iter().any(|line| line.contains("[page] network: 404")));
    }

    #[test]
    fn clean_pages_report_nothing() {
        let header = scenario("header_visible", homepage::header_visible);
        let report = run(&header, &fixture("personal-site"));
        assert!(report.outcome.is_passed(), "{:?}", report.outcome);
        assert!(report.captured.is_empty(), "{:?}", report.captured);
    }

    #[test]
    fn missing_directory_fails_before_running() {
        let never = scenario("never", |_, _| unreachable!());
        let target = SiteTarget::Dir(PathBuf::from("/nonexistent/homepage-site"));
        let report = run(&never, &target);
        assert!(matches!(&report.outcome, Outcome::Failed(msg) if msg.contains("does not exist")));
    }
}
