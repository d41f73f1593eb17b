//! # keeper-settings
//!
//! Configuration management with layered sources for the lease keeper.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`KeeperSettings::default()`]
//! 2. **User file**: `~/.lease-keeper/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: account secrets and `KEEPER_*` overrides (highest priority)
//!
//! Secrets (mailbox password, bot token) are normally supplied through the
//! environment only; the file layer exists for tuning selectors and timings.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = KeeperSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_match_target_panel() {
        let settings = KeeperSettings::default();
        assert_eq!(settings.mail.imap_host, "imap.gmail.com");
        assert_eq!(settings.mail.imap_port, 993);
        assert_eq!(settings.mail.sender, "Pella");
        assert_eq!(settings.mail.poll_rounds, 25);
        assert_eq!(settings.mail.poll_interval_ms, 12_000);
        assert_eq!(settings.panel.login_url, "https://www.pella.app/login");
        assert_eq!(settings.panel.renew_control_selector, r#"a[href*="cuty.io"]"#);
        assert_eq!(settings.funnel.continue_attempts, 5);
        assert_eq!(settings.funnel.robot_attempts, 8);
        assert_eq!(settings.funnel.reveal_attempts, 8);
        assert_eq!(settings.funnel.reveal_wait_ms, 18_000);
        assert_eq!(settings.gate.dimmed_token, "opacity-50");
        assert_eq!(settings.notify.utc_offset_hours, 8);
        assert!(settings.browser.headless);
    }
}
