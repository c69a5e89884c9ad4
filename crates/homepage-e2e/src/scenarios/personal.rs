//! Template de-branding: placeholder text from the demo home page must be gone.

use super::{expect_absent, expect_visible, open};
use crate::checklist::Expectations;
use crate::error::Result;
use crate::harness::TestSite;

pub fn placeholder_text_removed(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let checklist = &expectations.checklist;
    let browser = open(site, "/")?;

    let h1 = expect_visible(&browser, "/", "main h1")?;
    expect_absent(&h1, "/", "main h1", &checklist.forbidden_main_heading)?;

    for heading in browser.query("h1, h2, h3, h4, h5, h6")? {
        expect_absent(&heading, "/", &heading.tag, &checklist.forbidden_headings)?;
    }

    let hero = expect_visible(&browser, "/", "section")?;
    expect_absent(&hero, "/", "section", &checklist.forbidden_hero_phrases)
}
