//! # keeper-mail
//!
//! Out-of-band one-time-code retrieval.
//!
//! [`CodeChannel`] polls any [`keeper_core::Mailbox`] for a fresh code and
//! consumes exactly the message it came from. [`ImapMailbox`] is the
//! production mailbox, speaking IMAP over TLS.

#![deny(unsafe_code)]

pub mod body;
pub mod channel;
pub mod imap_mailbox;

pub use body::{extract_code, message_text};
pub use channel::{CodeChannel, PollBudget};
pub use imap_mailbox::{ImapConfig, ImapMailbox};
