//! Blog listing.

use super::{expect_visible, open};
use crate::checklist::Expectations;
use crate::error::{Result, ScenarioError};
use crate::harness::TestSite;

pub fn blog_index_lists_posts(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let checklist = &expectations.checklist;
    let route = checklist.blog_route.as_str();
    let browser = open(site, route)?;

    let main = expect_visible(&browser, route, r#"main, [role="main"]"#)?;
    let text = main.text().to_lowercase();
    if checklist
        .blog_markers
        .iter()
        .any(|marker| text.contains(&marker.to_lowercase()))
    {
        Ok(())
    } else {
        Err(ScenarioError::Content {
            route: route.to_string(),
            detail: format!(
                "main content mentions none of {:?}",
                checklist.blog_markers
            ),
        })
    }
}
