//! Navigation contract and interaction integrity on the home route.

use super::{expect_visible, open};
use crate::browser::{ClickOutcome, Node};
use crate::checklist::Expectations;
use crate::error::{Result, ScenarioError};
use crate::harness::TestSite;
use homepage_config::LinkTarget;
use tracing::{debug, info};

/// Links the interaction check clicks through
const NAV_LINKS: &str = "header nav a[href]";

pub fn sections_present(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    for id in &expectations.checklist.required_sections {
        expect_visible(&browser, "/", &format!("#{id}"))?;
    }
    Ok(())
}

/// Every configured header link is rendered in the header nav with its
/// href and its label (or an accepted alternative label).
pub fn nav_links_match_config(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "header nav")?;

    for link in &expectations.site.header.links {
        let labels = expectations.checklist.accepted_labels(&link.text, &link.href);
        let selector = format!("header nav a[href=\"{}\"]", escape(&link.href));
        let anchor = first_visible(browser.query(&selector)?).ok_or_else(|| {
            ScenarioError::Navigation {
                route: "/".to_string(),
                detail: format!("no visible link to {:?} in header nav", link.href),
            }
        })?;
        if !labels.iter().any(|label| anchor.contains_text(label)) {
            return Err(ScenarioError::Navigation {
                route: "/".to_string(),
                detail: format!(
                    "link to {:?} reads {:?}, expected one of {:?}",
                    link.href,
                    anchor.text(),
                    labels
                ),
            });
        }
        debug!(href = %link.href, text = %anchor.text(), "Nav link ok");
    }
    Ok(())
}

/// The footer renders the configured secondary and social links.
pub fn footer_links_match_config(site: &TestSite, expectations: &Expectations) -> Result<()> {
    let browser = open(site, "/")?;
    expect_visible(&browser, "/", "footer")?;
    let footer_data = &expectations.site.footer;

    for link in &footer_data.secondary_links {
        let selector = format!("a[href=\"{}\"]", escape(&link.href));
        let found = browser
            .query_within("footer", &selector)?
            .iter()
            .any(|a| a.contains_text(&link.text));
        if !found {
            return Err(ScenarioError::Navigation {
                route: "/".to_string(),
                detail: format!("footer has no {:?} link to {:?}", link.text, link.href),
            });
        }
    }

    for social in &footer_data.social_links {
        let selector = format!("a[aria-label=\"{}\"]", escape(&social.aria_label));
        if browser.query_within("footer", &selector)?.is_empty() {
            return Err(ScenarioError::Navigation {
                route: "/".to_string(),
                detail: format!("footer has no social link labelled {:?}", social.aria_label),
            });
        }
    }
    Ok(())
}

/// Click every visible in-page and same-site header link in order. After
/// each click there must be no console errors, no 4xx/5xx responses, and
/// the header nav must still be visible.
pub fn page_integrity_after_interaction(site: &TestSite, _: &Expectations) -> Result<()> {
    let mut browser = open(site, "/")?;
    browser.start_capture();

    let count = clickable_nav_links(&browser.query(NAV_LINKS)?).len();
    info!(count, engine = %browser.engine(), "Clicking header nav links");

    for index in 0..count {
        let route = browser.url()?.path().to_string();
        let (position, href) = clickable_nav_links(&browser.query(NAV_LINKS)?)
            .into_iter()
            .nth(index)
            .ok_or_else(|| ScenarioError::Navigation {
                route: route.clone(),
                detail: format!("nav link #{index} disappeared after the previous click"),
            })?;

        let outcome = browser.click(NAV_LINKS, position)?;
        debug!(%href, ?outcome, "Clicked");

        let errors = browser.captured();
        if !errors.is_empty() {
            return Err(ScenarioError::RuntimeErrors {
                action: format!("clicking {href:?} on {route}"),
                errors,
            });
        }

        if let ClickOutcome::Scrolled {
            fragment,
            found: false,
        } = &outcome
        {
            debug!(%fragment, "Fragment target not on page");
        }
        let now = browser.url()?.path().to_string();
        expect_visible(&browser, &now, "header nav")?;
    }
    Ok(())
}

/// Visible header nav links that stay on this site, as (position among
/// all [`NAV_LINKS`] matches, href), in document order
fn clickable_nav_links(links: &[Node]) -> Vec<(usize, String)> {
    links
        .iter()
        .enumerate()
        .filter(|(_, a)| a.visible)
        .filter_map(|(position, a)| a.attr("href").map(|href| (position, href)))
        .filter(|(_, href)| {
            matches!(
                LinkTarget::classify(href),
                Some(LinkTarget::Path(_) | LinkTarget::Anchor(_) | LinkTarget::Placeholder)
            )
        })
        .map(|(position, href)| (position, href.to_string()))
        .collect()
}

fn first_visible(nodes: Vec<Node>) -> Option<Node> {
    nodes.into_iter().find(|n| n.visible)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use std::collections::BTreeMap;

    fn link(href: Option<&str>, text: &str, visible: bool) -> Node {
        let attrs: BTreeMap<_, _> = href
            .map(|h| ("href".to_string(), h.to_string()))
            .into_iter()
            .collect();
        Node::new("a".to_string(), text, attrs, visible)
    }

    #[test]
    fn clickable_links_skip_external_and_hidden_targets() {
        let links = [
            link(Some("/"), "Home", true),
            link(Some("#about"), "About", true),
            link(Some("https://www.linkedin.com/"), "LinkedIn", true),
            link(Some("#projects"), "Mobile Projects", false),
            link(Some("/blog"), "Blog", true),
            link(None, "No href", true),
        ];
        assert_eq!(
            clickable_nav_links(&links),
            [
                (0, "/".to_string()),
                (1, "#about".to_string()),
                (4, "/blog".to_string())
            ]
        );
    }

    #[test]
    fn first_visible_skips_hidden_duplicates() {
        let found = first_visible(vec![
            link(Some("#about"), "Hidden About", false),
            link(Some("#about"), "About", true),
        ])
        .unwrap();
        assert_eq!(found.text(), "About");
        assert!(first_visible(vec![link(Some("/blog"), "Blog", false)]).is_none());
    }

    #[test]
    fn escape_quotes_in_selector_values() {
        let doc = Document::parse(r#"<footer><a aria-label="Say &quot;hi&quot;">x</a></footer>"#);
        let selector = format!("footer a[aria-label=\"{}\"]", escape("Say \"hi\""));
        assert_eq!(doc.select(&selector).unwrap().len(), 1);
    }
}
