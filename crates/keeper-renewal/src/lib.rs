//! # keeper-renewal
//!
//! The renewal engine. Given a [`BrowserDriver`](keeper_core::BrowserDriver), a
//! [`CodeChannel`](keeper_mail::CodeChannel), and a [`Notifier`](keeper_core::Notifier),
//! [`Orchestrator::run`] logs in with an emailed one-time code, finds the lease,
//! decides whether renewal is currently possible, walks the interstitial funnel,
//! and reports what happened.
//!
//! The pieces are usable on their own:
//!
//! - [`expiry`]: parse remaining lease time out of dashboard text
//! - [`eligibility`]: infer cooldown from the renewal control's classes
//! - [`funnel`]: retrying click steps with overlay removal and window cleanup
//! - [`windows`]: close stray pop-ups and refocus the canonical window
//! - [`lease`]: lease discovery from dashboard links

#![deny(unsafe_code)]

pub mod eligibility;
pub mod expiry;
pub mod funnel;
pub mod lease;
pub mod orchestrator;
pub mod plan;
pub mod windows;

#[cfg(test)]
mod testing;

pub use eligibility::{ControlState, Eligibility, GateMarkers};
pub use funnel::{Funnel, FunnelPlan, FunnelStep, Stage, StepOutcome, StepRecord};
pub use orchestrator::{Orchestrator, RunState, RunSummary};
pub use plan::RenewalPlan;
