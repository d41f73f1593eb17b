//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON file format.
//! Each type implements [`Default`] with production default values, and
//! `#[serde(default)]` allows partial JSON; missing fields keep their default.

mod mail;
mod notify;
mod panel;

pub use mail::*;
pub use notify::*;
pub use panel::*;

use std::path::PathBuf;

use keeper_core::Credentials;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the lease keeper.
///
/// # JSON Format
///
/// ```json
/// {
///   "panel": { "leaseId": "3609ece276a7473bba79f75fd897aa78" },
///   "funnel": { "robotAttempts": 10 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeeperSettings {
    /// Panel account identity.
    pub account: AccountSettings,
    /// Mailbox used to receive login codes.
    pub mail: MailSettings,
    /// Target panel URLs, selectors, and settle delays.
    pub panel: PanelSettings,
    /// Interstitial funnel selectors and retry budgets.
    pub funnel: FunnelSettings,
    /// Cooldown detection markers.
    pub gate: GateSettings,
    /// Browser launch options.
    pub browser: BrowserSettings,
    /// Notification channel.
    pub notify: NotifySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Directory for diagnostic screenshots.
    pub artifact_dir: String,
}

impl Default for KeeperSettings {
    fn default() -> Self {
        Self {
            account: AccountSettings::default(),
            mail: MailSettings::default(),
            panel: PanelSettings::default(),
            funnel: FunnelSettings::default(),
            gate: GateSettings::default(),
            browser: BrowserSettings::default(),
            notify: NotifySettings::default(),
            logging: LoggingSettings::default(),
            artifact_dir: "artifacts".to_string(),
        }
    }
}

impl KeeperSettings {
    /// Build the immutable run credentials, failing if either half is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.account.email.trim().is_empty() {
            return Err(SettingsError::Missing("account.email (PELLA_EMAIL)"));
        }
        if self.account.mailbox_secret.is_empty() {
            return Err(SettingsError::Missing(
                "account.mailboxSecret (GMAIL_APP_PASSWORD)",
            ));
        }
        Ok(Credentials::new(
            self.account.email.trim(),
            self.account.mailbox_secret.clone(),
        ))
    }

    /// Screenshot directory as a path.
    pub fn artifact_path(&self) -> PathBuf {
        PathBuf::from(&self.artifact_dir)
    }
}

/// Panel account identity.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSettings {
    /// Login email for the panel; also the mailbox username.
    pub email: String,
    /// Mailbox app password.
    pub mailbox_secret: String,
}

impl std::fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSettings")
            .field("email", &self.email)
            .field("mailbox_secret", &"<redacted>")
            .finish()
    }
}

/// Browser launch options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserSettings {
    /// Explicit Chrome binary. Discovered automatically when unset.
    pub chrome_path: Option<String>,
    /// Run without a visible window.
    pub headless: bool,
    /// Window size passed to Chrome as `width,height`.
    pub window_size: String,
    /// Optional user-agent override.
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            window_size: "1280,800".to_string(),
            user_agent: None,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
