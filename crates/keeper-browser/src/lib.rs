//! # keeper-browser
//!
//! Chrome DevTools Protocol driver for the lease keeper.
//!
//! [`BrowserSession`] launches a Chrome process, attaches to its first page
//! target over a `tokio-tungstenite` WebSocket, and implements
//! [`keeper_core::BrowserDriver`]. The attached page is the canonical window;
//! other page targets (pop-ups opened by third-party content) are listed and
//! closed through the DevTools HTTP endpoints.

#![deny(unsafe_code)]

pub mod chrome;
mod driver;
pub mod script;
pub mod session;

pub use chrome::find_chrome;
pub use session::{BrowserSession, LaunchOptions};
