//! End-to-end verification of the personal homepage
//!
//! Scenarios drive a [`browser::Browser`] against a [`harness::TestSite`],
//! which is either a running deployment or a directory served from an
//! in-process static server. Pass/fail expectations come from the site
//! data in `homepage-config` plus a [`checklist::Checklist`].

pub mod browser;
pub mod checklist;
pub mod dom;
pub mod error;
pub mod harness;
pub mod runner;
pub mod scenarios;
pub mod selector;
pub mod serve;

pub use browser::{Browser, Engine};
pub use checklist::{Checklist, Expectations};
pub use error::{CapturedError, ScenarioError};
pub use harness::TestSite;
pub use runner::{Outcome, ScenarioReport, SiteTarget, run_scenario};
pub use scenarios::Scenario;
