//! Expiry reader: turn dashboard text into an [`ExpirySnapshot`].

use std::sync::LazyLock;

use regex::Regex;

use keeper_core::{BrowserDriver, ExpirySnapshot};

/// Longest excerpt kept when no units can be parsed.
pub const RAW_EXCERPT_LIMIT: usize = 60;

const MARKERS: &[&str] = &["expiring", "expires", "到期", "过期"];

static UNIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:days?|hours?|hrs?|minutes?|mins?)\b|天|小时|小時|分钟|分鐘").unwrap()
});
static EXPIRING_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)expiring in").unwrap());
static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:days?\b|天)").unwrap());
static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:hours?\b|hrs?\b|小时|小時)").unwrap());
static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:minutes?\b|mins?\b|分钟|分鐘)").unwrap());

/// Read the snapshot from text blocks in document order.
pub fn read_expiry<S: AsRef<str>>(blocks: &[S]) -> ExpirySnapshot {
    let Some(block) = blocks.iter().map(AsRef::<str>::as_ref).find(|b| qualifies(b)) else {
        return ExpirySnapshot::Unavailable;
    };
    let normalized = normalize(block);

    // Prefer the sentence carrying the marker so unrelated durations elsewhere
    // in a large block do not leak in.
    let parsed = marker_sentences(&normalized)
        .find_map(parse_units)
        .or_else(|| parse_units(&normalized));
    parsed.unwrap_or_else(|| ExpirySnapshot::Raw {
        excerpt: raw_excerpt(&normalized),
    })
}

/// Read the snapshot straight from the page. Read failures yield `Unavailable`.
pub async fn read_from_page(driver: &dyn BrowserDriver, selector: &str) -> ExpirySnapshot {
    match driver.text_blocks(selector).await {
        Ok(blocks) => read_expiry(&blocks),
        Err(e) => {
            tracing::warn!(error = %e, "could not read expiry text");
            ExpirySnapshot::Unavailable
        }
    }
}

fn has_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

fn qualifies(block: &str) -> bool {
    has_marker(block) && UNIT_TOKEN.is_match(block)
}

fn normalize(block: &str) -> String {
    block.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn marker_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '。', '!', '！']).filter(|s| has_marker(s))
}

fn capture(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn parse_units(text: &str) -> Option<ExpirySnapshot> {
    let days = capture(&DAYS, text);
    let hours = capture(&HOURS, text);
    let minutes = capture(&MINUTES, text);
    if days.is_none() && hours.is_none() && minutes.is_none() {
        return None;
    }
    Some(ExpirySnapshot::Parsed {
        days,
        hours,
        minutes,
    })
}

fn raw_excerpt(normalized: &str) -> String {
    let tail = EXPIRING_IN.find(normalized).map(|m| {
        let after = &normalized[m.end()..];
        after.split('.').next().unwrap_or(after).trim()
    });
    let source = tail.filter(|t| !t.is_empty()).unwrap_or(normalized);
    source.chars().take(RAW_EXCERPT_LIMIT).collect()
}
