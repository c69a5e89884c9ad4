//! The verification checklist
//!
//! Every scenario gets its own [`TestSite`] handle and opens its own
//! [`Browser`](crate::browser::Browser) context, so scenarios share no state
//! and can run in any order.

use crate::browser::{Browser, Node};
use crate::checklist::Expectations;
use crate::error::{Result, ScenarioError};
use crate::harness::TestSite;

pub mod blog;
pub mod homepage;
pub mod navigation;
pub mod personal;
pub mod routes;

pub type ScenarioFn = fn(&TestSite, &Expectations) -> Result<()>;

/// A named scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub module: &'static str,
    pub func: ScenarioFn,
}

impl Scenario {
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    pub fn run(&self, site: &TestSite, expectations: &Expectations) -> Result<()> {
        (self.func)(site, expectations)
    }
}

macro_rules! scenario {
    ($module:ident :: $name:ident) => {
        Scenario {
            name: stringify!($name),
            module: stringify!($module),
            func: $module::$name,
        }
    };
}

/// Every scenario, in the order the runner executes them
pub fn all() -> Vec<Scenario> {
    vec![
        // load checks
        scenario!(homepage::loads_without_errors),
        scenario!(homepage::header_visible),
        scenario!(homepage::navigation_menu_visible),
        scenario!(homepage::footer_visible),
        scenario!(homepage::hero_section_rendered),
        // content-absence checks
        scenario!(personal::placeholder_text_removed),
        // navigation-contract checks
        scenario!(navigation::sections_present),
        scenario!(navigation::nav_links_match_config),
        scenario!(navigation::footer_links_match_config),
        // interaction-integrity checks
        scenario!(navigation::page_integrity_after_interaction),
        // negative-route checks
        scenario!(routes::alternative_homes_disabled),
        // blog-listing check
        scenario!(blog::blog_index_lists_posts),
    ]
}

/// The first element matching `selector`, which must also be visible
pub(crate) fn expect_visible(browser: &Browser, route: &str, selector: &str) -> Result<Node> {
    match browser.query(selector)?.into_iter().next() {
        Some(node) if node.visible => Ok(node),
        _ => Err(ScenarioError::Missing {
            route: route.to_string(),
            selector: selector.to_string(),
        }),
    }
}

/// Fail with a leak error when `element` contains any of `needles`
pub(crate) fn expect_absent(
    element: &Node,
    route: &str,
    selector: &str,
    needles: &[String],
) -> Result<()> {
    match needles.iter().find(|needle| element.contains_text(needle)) {
        Some(needle) => Err(ScenarioError::Leak {
            route: route.to_string(),
            selector: selector.to_string(),
            needle: needle.clone(),
        }),
        None => Ok(()),
    }
}

/// Navigate a fresh browser to `route` and require a 200
pub(crate) fn open(site: &TestSite, route: &str) -> Result<Browser> {
    let mut browser = site.browser()?;
    let status = browser.goto(route)?.status;
    if status != 200 {
        return Err(ScenarioError::Routing {
            route: route.to_string(),
            expected: 200,
            actual: status,
        });
    }
    Ok(browser)
}
