//! # keeper-notify
//!
//! Report delivery. [`TelegramNotifier`] posts formatted reports (with the
//! screenshot attached when one exists) to a chat; [`LogNotifier`] only logs.

#![deny(unsafe_code)]

pub mod format;
pub mod log;
pub mod telegram;

use std::sync::Arc;

use keeper_core::Notifier;
use keeper_settings::NotifySettings;

pub use format::ReportFormatter;
pub use log::LogNotifier;
pub use telegram::TelegramNotifier;

/// Notifier selected by `settings`: Telegram when configured, logging otherwise.
pub fn from_settings(settings: &NotifySettings, account: &str) -> Arc<dyn Notifier> {
    let Some((token, chat_id)) = settings.telegram() else {
        tracing::info!("telegram not configured, reports go to the log only");
        return Arc::new(LogNotifier);
    };
    let formatter = ReportFormatter::new(&settings.title, account, settings.utc_offset_hours);
    match TelegramNotifier::new(&settings.telegram_api_base, token, chat_id, formatter) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::warn!(error = %e, "telegram notifier unavailable, falling back to log");
            Arc::new(LogNotifier)
        }
    }
}
