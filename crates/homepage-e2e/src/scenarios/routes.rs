//! Routes that must stay disabled.

use crate::checklist::Expectations;
use crate::error::Result;
use crate::harness::TestSite;
use tracing::debug;

/// The alternative demo home pages are prefixed out of routing and must 404.
pub fn alternative_homes_disabled(site: &TestSite, expectations: &Expectations) -> Result<()> {
    for route in &expectations.checklist.disabled_routes {
        let resp = site.get(route)?;
        debug!(%route, status = resp.status, "Disabled route answered");
        resp.expect_status(route, 404)?;
    }
    Ok(())
}
