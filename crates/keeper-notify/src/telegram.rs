//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use keeper_core::{NotifyError, Notifier, Report};

use crate::format::ReportFormatter;

/// Telegram caps photo captions at 1024 characters.
const CAPTION_LIMIT: usize = 1024;

/// Posts reports to a chat through a bot.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    formatter: ReportFormatter,
}

impl TelegramNotifier {
    /// Notifier posting to `chat_id` via `api_base` (normally `https://api.telegram.org`).
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        formatter: ReportFormatter,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            formatter,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;
        check(response).await
    }

    async fn send_photo(
        &self,
        caption: &str,
        photo: Vec<u8>,
        file_name: String,
    ) -> Result<(), NotifyError> {
        let part = reqwest::multipart::Part::bytes(photo)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| NotifyError::Transport(format!("multipart: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", truncate(caption, CAPTION_LIMIT))
            .text("parse_mode", "Markdown")
            .part("photo", part);
        let response = self
            .client
            .post(self.endpoint("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;
        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body,
    })
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit.saturating_sub(1)).chain(['…']).collect()
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        let text = self.formatter.render(report);

        if let Some(path) = &report.artifact {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let file_name = path.file_name().map_or_else(
                        || "screenshot.png".to_string(),
                        |n| n.to_string_lossy().into_owned(),
                    );
                    self.send_photo(&text, bytes, file_name).await?;
                    tracing::debug!(status = report.status(), "telegram photo report sent");
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "artifact missing, sending text only");
                }
                Err(e) => return Err(NotifyError::Artifact(e)),
            }
        }

        self.send_message(&text).await?;
        tracing::debug!(status = report.status(), "telegram report sent");
        Ok(())
    }
}
