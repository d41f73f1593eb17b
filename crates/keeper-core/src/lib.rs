//! # keeper-core
//!
//! Foundation types, errors, and dependency-injection traits for the lease keeper.
//!
//! This crate provides the shared vocabulary that every other keeper crate depends on:
//!
//! - **Domain types**: [`Credentials`], [`OneTimeCode`], [`LeaseRef`], [`ExpirySnapshot`],
//!   [`RenewalOutcome`], [`Report`]
//! - **Errors**: per-domain `thiserror` enums rolled up into [`RenewalError`]
//! - **Traits**: [`BrowserDriver`], [`Mailbox`], [`Notifier`], the seams the renewal engine
//!   consumes without knowing the concrete browser, mail server, or chat service
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod traits;
pub mod types;

pub use errors::{BrowserError, MailError, NotifyError, RenewalError};
pub use traits::{BrowserDriver, Mailbox, MessageId, Notifier, WindowId};
pub use types::{
    Credentials, ExpirySnapshot, LeaseRef, OneTimeCode, RenewalOutcome, Report, ReportKind,
};
