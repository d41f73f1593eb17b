//! Error hierarchy for the lease keeper.
//!
//! - [`BrowserError`]: browser automation failures (launch, navigation, actions, CDP)
//! - [`MailError`]: mailbox access and one-time-code retrieval failures
//! - [`NotifyError`]: notification delivery failures (never fatal to a run)
//! - [`RenewalError`]: run-aborting conditions surfaced by the orchestrator

use thiserror::Error;

/// Failures of the browser driver.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Chrome did not start or its DevTools endpoint never came up.
    #[error("failed to launch browser: {context}")]
    LaunchFailed {
        /// Launch stage and cause.
        context: String,
    },

    /// A page load was rejected or never became ready.
    #[error("navigation failed for {url}: {reason}")]
    NavigationFailed {
        /// Target URL.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// An input, script, or capture command failed.
    #[error("{action} failed: {reason}")]
    ActionFailed {
        /// The action that failed (e.g., "click", "type").
        action: String,
        /// Why it failed.
        reason: String,
    },

    /// No Chrome executable in any probed location.
    #[error("Chrome not found; install Google Chrome or set CHROME_PATH")]
    ChromeNotFound,

    /// A selector matched nothing.
    #[error("element not found: {selector}")]
    ElementNotFound {
        /// The selector.
        selector: String,
    },

    /// A window handle the caller referenced no longer exists.
    #[error("window not found: {window}")]
    WindowNotFound {
        /// The missing window id.
        window: String,
    },

    /// Operation timed out.
    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout {
        /// How long we waited.
        timeout_ms: u64,
        /// The awaited condition.
        context: String,
    },

    /// CDP protocol error.
    #[error("CDP error: {0}")]
    Cdp(String),
}

/// Errors from mailbox access and one-time-code retrieval.
#[derive(Debug, Error)]
pub enum MailError {
    /// TCP/TLS connection to the mail server failed.
    #[error("mail connect failed for {host}:{port}: {reason}")]
    Connect {
        /// Mail server host.
        host: String,
        /// Mail server port.
        port: u16,
        /// Why it failed.
        reason: String,
    },

    /// The server rejected the credentials.
    #[error("mail login failed for '{account}': {reason}")]
    Auth {
        /// Account that failed to authenticate.
        account: String,
        /// Server-provided reason.
        reason: String,
    },

    /// A mailbox command (select, search, fetch, store) failed.
    #[error("mail {command} failed: {reason}")]
    Protocol {
        /// The command that failed.
        command: String,
        /// Why it failed.
        reason: String,
    },

    /// A message body could not be decoded.
    #[error("message {id} could not be parsed: {reason}")]
    Parse {
        /// Message id.
        id: u32,
        /// Why parsing failed.
        reason: String,
    },

    /// No qualifying code arrived within the polling budget.
    #[error("no one-time code received after {rounds} rounds")]
    CodeTimeout {
        /// Rounds polled before giving up.
        rounds: u32,
    },
}

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP transport failure.
    #[error("notification transport failed: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status.
    #[error("notification rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The artifact attached to a report could not be read.
    #[error("artifact unreadable: {0}")]
    Artifact(#[from] std::io::Error),
}

/// Run-aborting conditions raised by the renewal orchestrator.
///
/// Expected degraded cases (a funnel step giving up, unparsable expiry text) are not
/// errors; they are carried by `StepOutcome` and [`RenewalOutcome`](crate::RenewalOutcome).
#[derive(Debug, Error)]
pub enum RenewalError {
    /// The login page could not be opened.
    #[error("login page unreachable: {0}")]
    LoginUnreachable(#[source] BrowserError),

    /// No one-time code arrived, so the session cannot authenticate.
    #[error("one-time code not received: {0}")]
    CodeTimeout(#[source] MailError),

    /// No lease link was found on the authenticated landing page.
    #[error("lease reference not discoverable: {0}")]
    LeaseNotFound(String),

    /// Unrecovered browser failure outside a retry loop.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Unrecovered mailbox failure.
    #[error(transparent)]
    Mail(#[from] MailError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
