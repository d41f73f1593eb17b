use serde::{Deserialize, Serialize};

/// Notification channel settings.
///
/// When either Telegram field is missing, reports are only logged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifySettings {
    /// Telegram bot token.
    pub telegram_bot_token: Option<String>,
    /// Telegram chat to post into.
    pub telegram_chat_id: Option<String>,
    /// Bot API base URL.
    pub telegram_api_base: String,
    /// Heading of every report.
    pub title: String,
    /// Hour offset from UTC used for report timestamps.
    pub utc_offset_hours: i32,
    /// Send intermediate progress reports with screenshots.
    pub progress: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: "https://api.telegram.org".to_string(),
            title: "Pella renewal report".to_string(),
            utc_offset_hours: 8,
            progress: true,
        }
    }
}

impl NotifySettings {
    /// Token and chat id, when both are configured and non-empty.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        let token = self.telegram_bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.telegram_chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat))
    }
}

impl std::fmt::Debug for NotifySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySettings")
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "<redacted>"),
            )
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("title", &self.title)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("progress", &self.progress)
            .finish()
    }
}
