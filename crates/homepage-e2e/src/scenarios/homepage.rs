//! Load checks for the home route.

use super::{expect_visible, open};
use crate::checklist::Expectations;
use crate::error::{Result, ScenarioError};
use crate::harness::TestSite;
use tracing::info;

pub fn loads_without_errors(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    let title = browser.title()?;
    let pattern = expectations
        .checklist
        .title_regex()
        .map_err(|e| ScenarioError::Content {
            route: "/".to_string(),
            detail: e.to_string(),
        })?;
    info!(%title, "Home page loaded");
    if pattern.is_match(&title) {
        Ok(())
    } else {
        Err(ScenarioError::Content {
            route: "/".to_string(),
            detail: format!("title {title:?} does not match /{pattern}/"),
        })
    }
}

pub fn header_visible(site: &TestSite, _: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "#header")?;
    Ok(())
}

pub fn navigation_menu_visible(site: &TestSite, _: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "header nav")?;
    Ok(())
}

pub fn footer_visible(site: &TestSite, _: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "footer")?;
    Ok(())
}

pub fn hero_section_rendered(site: &TestSite, _: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "section")?;
    Ok(())
}
