//! Lease discovery from the authenticated landing page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use keeper_core::LeaseRef;

static LEASE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/server/([A-Za-z0-9_-]+)").unwrap());

/// Turn lease-link `href`s into unique leases, preserving page order.
pub fn parse_links<S: AsRef<str>>(hrefs: &[S]) -> Vec<LeaseRef> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter_map(|href| {
            let href: &str = href.as_ref();
            let href = href.trim();
            let id = LEASE_ID.captures(href)?.get(1)?.as_str().to_string();
            Some(LeaseRef {
                id,
                dashboard_url: href.to_string(),
            })
        })
        .filter(|lease| seen.insert(lease.id.clone()))
        .collect()
}

/// The preferred lease if present, else the first one.
pub fn select(leases: Vec<LeaseRef>, preferred: Option<&str>) -> Option<LeaseRef> {
    if let Some(wanted) = preferred {
        if let Some(found) = leases.iter().find(|l| l.id == wanted) {
            return Some(found.clone());
        }
        tracing::warn!(
            lease = wanted,
            available = leases.len(),
            "configured lease not listed, using first"
        );
    }
    leases.into_iter().next()
}
