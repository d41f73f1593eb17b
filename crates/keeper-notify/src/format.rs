//! Report text rendering.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use keeper_core::{RenewalOutcome, Report, ReportKind};

const RULE: &str = "━━━━━━━━━━━━━━━━━━";

/// Renders reports as Telegram-flavoured Markdown.
#[derive(Clone, Debug)]
pub struct ReportFormatter {
    title: String,
    account: String,
    offset: FixedOffset,
}

impl ReportFormatter {
    /// Formatter for `account`, stamping times at `utc_offset_hours`.
    ///
    /// Offsets outside ±23 hours fall back to UTC.
    pub fn new(title: impl Into<String>, account: impl Into<String>, utc_offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600))
            .unwrap_or_else(|| {
                tracing::warn!(utc_offset_hours, "invalid report offset, using UTC");
                Utc.fix()
            });
        Self {
            title: title.into(),
            account: account.into(),
            offset,
        }
    }

    /// Render `report` stamped with the current time.
    pub fn render(&self, report: &Report) -> String {
        self.render_at(report, Utc::now())
    }

    /// Render `report` stamped with `now`.
    pub fn render_at(&self, report: &Report, now: DateTime<Utc>) -> String {
        let stamp = now.with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S");
        format!(
            "{emoji} *{title}*\n{RULE}\n👤 *Account*: `{account}`\n📡 *Status*: {status}\n📝 {message}\n🕒 *Time*: `{stamp} ({offset})`\n{RULE}",
            emoji = emoji(&report.kind),
            title = self.title,
            account = self.account,
            status = report.status(),
            message = report.message,
            offset = self.offset,
        )
    }
}

fn emoji(kind: &ReportKind) -> &'static str {
    match kind {
        ReportKind::Progress => "ℹ️",
        ReportKind::Outcome(RenewalOutcome::Renewed) => "✅",
        ReportKind::Outcome(RenewalOutcome::Cooldown) => "⏸️",
        ReportKind::Outcome(RenewalOutcome::IncompleteVerified) => "⚠️",
        ReportKind::Outcome(RenewalOutcome::Failed { .. }) => "❌",
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn renders_all_fields_in_offset() {
        let fmt = ReportFormatter::new("Pella renewal report", "owner@example.com", 8);
        let report = Report::outcome(
            RenewalOutcome::Renewed,
            "Expiry before: 1 day, after: 3 days",
            None,
        );
        let text = fmt.render_at(&report, noon_utc());
        assert!(text.starts_with("✅ *Pella renewal report*"));
        assert!(text.contains("`owner@example.com`"));
        assert!(text.contains("*Status*: renewed"));
        assert!(text.contains("Expiry before: 1 day, after: 3 days"));
        assert!(text.contains("`2026-03-01 20:00:00 (+08:00)`"));
    }

    #[test]
    fn emoji_tracks_outcome() {
        let fmt = ReportFormatter::new("t", "a", 0);
        let failed = Report::outcome(
            RenewalOutcome::Failed {
                reason: "boom".into(),
            },
            "boom",
            None,
        );
        assert!(fmt.render_at(&failed, noon_utc()).starts_with("❌"));
        let progress = Report::progress("Dashboard reached", None);
        let text = fmt.render_at(&progress, noon_utc());
        assert!(text.starts_with("ℹ️"));
        assert!(text.contains("*Status*: progress"));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let fmt = ReportFormatter::new("t", "a", 99);
        let text = fmt.render_at(&Report::progress("x", None), noon_utc());
        assert!(text.contains("2026-03-01 12:00:00 (+00:00)"));
    }
}
