use serde::{Deserialize, Serialize};

/// Mailbox used to receive one-time login codes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailSettings {
    /// IMAP server host.
    pub imap_host: String,
    /// IMAP server TLS port.
    pub imap_port: u16,
    /// Folder searched for codes.
    pub folder: String,
    /// Sender name/address the code email comes from.
    pub sender: String,
    /// Maximum polling rounds before giving up.
    pub poll_rounds: u32,
    /// Delay between polling rounds in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap_host: "imap.gmail.com".to_string(),
            imap_port: 993,
            folder: "INBOX".to_string(),
            sender: "Pella".to_string(),
            poll_rounds: 25,
            poll_interval_ms: 12_000,
        }
    }
}
