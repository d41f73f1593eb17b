//! Dependency-injection traits consumed by the renewal engine.
//!
//! The engine never talks to Chrome, IMAP, or a chat API directly. Concrete
//! adapters live in `keeper-browser`, `keeper-mail`, and `keeper-notify`; tests
//! substitute in-memory fakes.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{BrowserError, MailError, NotifyError};
use crate::types::Report;

// ─────────────────────────────────────────────────────────────────────────────
// Browser
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque handle of a browser window/tab.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub String);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Low-level browser capability used by the renewal engine.
///
/// All selector arguments are CSS selectors evaluated in the canonical window.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the canonical window to `url` and wait for load.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Whether an element matching `selector` exists and is rendered.
    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Wait until `selector` is visible or `timeout` elapses.
    async fn wait_for_visible(&self, selector: &str, timeout: Duration)
    -> Result<(), BrowserError>;

    /// Script-dispatched click on the first match of `selector`.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Type `text` into `selector`, pausing `per_char` between keystrokes.
    async fn type_slowly(
        &self,
        selector: &str,
        text: &str,
        per_char: Duration,
    ) -> Result<(), BrowserError>;

    /// Press Enter with `selector` focused.
    async fn press_enter(&self, selector: &str) -> Result<(), BrowserError>;

    /// Read one attribute of the first match. `Ok(None)` if the attribute is absent.
    async fn attribute(&self, selector: &str, name: &str)
    -> Result<Option<String>, BrowserError>;

    /// Read one attribute from every match, skipping elements without it.
    async fn attribute_all(&self, selector: &str, name: &str)
    -> Result<Vec<String>, BrowserError>;

    /// Rendered text of every element matching `selector`, in document order.
    async fn text_blocks(&self, selector: &str) -> Result<Vec<String>, BrowserError>;

    /// Remove every element matching any selector. Returns how many were removed.
    async fn remove_elements(&self, selectors: &[String]) -> Result<usize, BrowserError>;

    /// Click the interactive region of a (possibly cross-origin) iframe.
    async fn click_frame(&self, frame_selector: &str) -> Result<(), BrowserError>;

    /// Attempt the page's bot-check gate, if one is shown. Returns whether one was found.
    async fn solve_bot_check(&self) -> Result<bool, BrowserError>;

    /// Every open page window, canonical included.
    async fn windows(&self) -> Result<Vec<WindowId>, BrowserError>;

    /// The window this driver controls.
    fn canonical_window(&self) -> WindowId;

    /// Close a window.
    async fn close_window(&self, window: &WindowId) -> Result<(), BrowserError>;

    /// Bring a window to the foreground.
    async fn focus_window(&self, window: &WindowId) -> Result<(), BrowserError>;

    /// Save a PNG screenshot of the canonical window to `path`.
    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mailbox
// ─────────────────────────────────────────────────────────────────────────────

/// Mailbox-local message identifier. Higher ids are more recent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal mailbox operations needed to receive a login code.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Unread messages whose sender matches `sender`.
    async fn search_unseen_from(&self, sender: &str) -> Result<Vec<MessageId>, MailError>;

    /// Full RFC 822 source of a message, without marking it read.
    async fn fetch_raw(&self, id: MessageId) -> Result<Vec<u8>, MailError>;

    /// Mark a message as read so later searches skip it.
    async fn mark_seen(&self, id: MessageId) -> Result<(), MailError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifier
// ─────────────────────────────────────────────────────────────────────────────

/// Receives progress and terminal reports. Fire-and-forget from the engine's view.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one report.
    async fn notify(&self, report: &Report) -> Result<(), NotifyError>;
}
