//! Domain types shared across the keeper crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Credentials / codes
// ─────────────────────────────────────────────────────────────────────────────

/// Account identifier plus the secret used to read its mailbox.
///
/// Built once at process entry and passed by reference afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    account: String,
    mailbox_secret: String,
}

impl Credentials {
    /// Create credentials from an account identifier and mailbox secret.
    pub fn new(account: impl Into<String>, mailbox_secret: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            mailbox_secret: mailbox_secret.into(),
        }
    }

    /// The account identifier (an email address).
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The mailbox access secret (e.g. an app password).
    pub fn mailbox_secret(&self) -> &str {
        &self.mailbox_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("mailbox_secret", &"<redacted>")
            .finish()
    }
}

/// A six-digit single-use login code extracted from one email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    /// Wrap an already-validated code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lease
// ─────────────────────────────────────────────────────────────────────────────

/// The lease being renewed, as discovered on the authenticated landing page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRef {
    /// Opaque server/lease identifier.
    pub id: String,
    /// Absolute URL of the lease dashboard.
    pub dashboard_url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Expiry
// ─────────────────────────────────────────────────────────────────────────────

/// Remaining lease time as shown on the dashboard. Used for reporting only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExpirySnapshot {
    /// At least one of days/hours/minutes was recognized.
    Parsed {
        /// Whole days remaining.
        days: Option<u32>,
        /// Whole hours remaining.
        hours: Option<u32>,
        /// Whole minutes remaining.
        minutes: Option<u32>,
    },
    /// Expiry text was found but no unit could be extracted.
    Raw {
        /// Capped excerpt of the page text.
        excerpt: String,
    },
    /// No expiry text was found.
    Unavailable,
}

impl ExpirySnapshot {
    /// Human-readable sentinel used when nothing could be read.
    pub const UNAVAILABLE: &'static str = "unavailable";
}

impl fmt::Display for ExpirySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed {
                days,
                hours,
                minutes,
            } => {
                let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
                    .into_iter()
                    .filter_map(|(value, unit)| {
                        value.map(|n| {
                            if n == 1 {
                                format!("{n} {unit}")
                            } else {
                                format!("{n} {unit}s")
                            }
                        })
                    })
                    .collect();
                if parts.is_empty() {
                    f.write_str(Self::UNAVAILABLE)
                } else {
                    f.write_str(&parts.join(", "))
                }
            }
            Self::Raw { excerpt } => f.write_str(excerpt),
            Self::Unavailable => f.write_str(Self::UNAVAILABLE),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome / reports
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal classification of one renewal run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RenewalOutcome {
    /// The final funnel step cleared.
    Renewed,
    /// The renewal control was in cooldown; nothing was attempted.
    Cooldown,
    /// The run completed but the funnel could not be confirmed.
    IncompleteVerified,
    /// A fatal error aborted the run.
    Failed {
        /// Why the run failed.
        reason: String,
    },
}

impl RenewalOutcome {
    /// Short machine-readable status label.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Renewed => "renewed",
            Self::Cooldown => "cooldown",
            Self::IncompleteVerified => "incomplete",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether the run ended successfully (renewed or safely skipped).
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Renewed | Self::Cooldown)
    }
}

/// What a [`Report`] describes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// An intermediate milestone during the run.
    Progress,
    /// The single terminal report of the run.
    Outcome(RenewalOutcome),
}

/// A message handed to the [`Notifier`](crate::Notifier).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Progress or terminal outcome.
    pub kind: ReportKind,
    /// Free-form body.
    pub message: String,
    /// Optional diagnostic screenshot.
    pub artifact: Option<PathBuf>,
}

impl Report {
    /// Build a progress report.
    pub fn progress(message: impl Into<String>, artifact: Option<PathBuf>) -> Self {
        Self {
            kind: ReportKind::Progress,
            message: message.into(),
            artifact,
        }
    }

    /// Build a terminal outcome report.
    pub fn outcome(
        outcome: RenewalOutcome,
        message: impl Into<String>,
        artifact: Option<PathBuf>,
    ) -> Self {
        Self {
            kind: ReportKind::Outcome(outcome),
            message: message.into(),
            artifact,
        }
    }

    /// Status label: `progress` or the outcome's status.
    pub fn status(&self) -> &'static str {
        match &self.kind {
            ReportKind::Progress => "progress",
            ReportKind::Outcome(outcome) => outcome.status(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("me@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn parsed_snapshot_renders_present_units_only() {
        let snap = ExpirySnapshot::Parsed {
            days: Some(2),
            hours: None,
            minutes: Some(10),
        };
        assert_eq!(snap.to_string(), "2 days, 10 minutes");
    }

    #[test]
    fn parsed_snapshot_singular_units() {
        let snap = ExpirySnapshot::Parsed {
            days: Some(1),
            hours: Some(1),
            minutes: Some(1),
        };
        assert_eq!(snap.to_string(), "1 day, 1 hour, 1 minute");
    }

    #[test]
    fn empty_parsed_snapshot_renders_sentinel() {
        let snap = ExpirySnapshot::Parsed {
            days: None,
            hours: None,
            minutes: None,
        };
        assert_eq!(snap.to_string(), ExpirySnapshot::UNAVAILABLE);
    }

    #[test]
    fn outcome_status_labels() {
        assert_eq!(RenewalOutcome::Renewed.status(), "renewed");
        assert_eq!(RenewalOutcome::Cooldown.status(), "cooldown");
        assert_eq!(RenewalOutcome::IncompleteVerified.status(), "incomplete");
        let failed = RenewalOutcome::Failed {
            reason: "boom".into(),
        };
        assert_eq!(failed.status(), "failed");
        assert!(!failed.is_success());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(RenewalOutcome::Failed {
            reason: "x".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "x");
    }

    #[test]
    fn report_status_follows_kind() {
        assert_eq!(Report::progress("hi", None).status(), "progress");
        assert_eq!(
            Report::outcome(RenewalOutcome::Cooldown, "wait", None).status(),
            "cooldown"
        );
    }
}
