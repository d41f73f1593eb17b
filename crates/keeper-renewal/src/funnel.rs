//! Funnel driver: click through the interstitial pages in front of the
//! renewal action.
//!
//! Each clickable step is retried until its trigger disappears. Failures are
//! never fatal; a step that runs out of attempts reports [`StepOutcome::GaveUp`]
//! and the run continues with the next stage.

use std::time::Duration;

use keeper_core::BrowserDriver;
use keeper_settings::FunnelSettings;

use crate::windows;

/// One clickable funnel step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunnelStep {
    /// Short name used in logs and reports.
    pub name: String,
    /// Trigger element; the step is done once it is no longer visible.
    pub selector: String,
    /// Click attempts before giving up.
    pub max_attempts: u32,
    /// Wait after each click.
    pub settle: Duration,
}

/// Result of one [`FunnelStep`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The trigger is gone. `clicks` is zero when it was never shown.
    Reached {
        /// Successful clicks dispatched.
        clicks: u32,
    },
    /// The trigger was still visible after every attempt.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
}

impl StepOutcome {
    /// Whether the step's trigger is gone.
    pub fn is_reached(self) -> bool {
        matches!(self, Self::Reached { .. })
    }
}

/// Named step result, in execution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// How it ended.
    pub outcome: StepOutcome,
}

/// One stage of the fixed funnel sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Unconditional wait.
    Wait {
        /// What the wait is for.
        label: &'static str,
        /// How long.
        duration: Duration,
    },
    /// Click a challenge iframe if present, then wait.
    Challenge {
        /// The iframe.
        frame_selector: String,
        /// Wait after clicking.
        settle: Duration,
    },
    /// A clickable step.
    Click(FunnelStep),
}

/// The funnel sequence and the knobs shared by its steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunnelPlan {
    /// Stages in execution order.
    pub stages: Vec<Stage>,
    /// Overlays removed before every click.
    pub overlays: Vec<String>,
    /// Wait between attempts that did not clear a trigger.
    pub retry_delay: Duration,
}

impl FunnelPlan {
    /// Continue, challenge, robot, timed wait, reveal.
    pub fn from_settings(s: &FunnelSettings) -> Self {
        let settle = Duration::from_millis(s.click_settle_ms);
        let step = |name: &str, selector: &str, max_attempts: u32| {
            Stage::Click(FunnelStep {
                name: name.into(),
                selector: selector.into(),
                max_attempts,
                settle,
            })
        };
        Self {
            stages: vec![
                step("continue", &s.continue_selector, s.continue_attempts),
                Stage::Wait {
                    label: "pre-challenge",
                    duration: Duration::from_millis(s.pre_challenge_ms),
                },
                Stage::Challenge {
                    frame_selector: s.challenge_frame_selector.clone(),
                    settle: Duration::from_millis(s.challenge_settle_ms),
                },
                step("robot", &s.robot_selector, s.robot_attempts),
                Stage::Wait {
                    label: "reveal timer",
                    duration: Duration::from_millis(s.reveal_wait_ms),
                },
                step("reveal", &s.reveal_selector, s.reveal_attempts),
            ],
            overlays: s.overlay_selectors.clone(),
            retry_delay: Duration::from_millis(s.retry_delay_ms),
        }
    }

    /// Clickable steps, in order.
    pub fn steps(&self) -> impl Iterator<Item = &FunnelStep> {
        self.stages.iter().filter_map(|stage| match stage {
            Stage::Click(step) => Some(step),
            _ => None,
        })
    }
}

/// Executes funnel stages against a driver.
pub struct Funnel<'a> {
    driver: &'a dyn BrowserDriver,
    plan: &'a FunnelPlan,
}

impl<'a> Funnel<'a> {
    /// Bind a plan to a driver.
    pub fn new(driver: &'a dyn BrowserDriver, plan: &'a FunnelPlan) -> Self {
        Self { driver, plan }
    }

    /// Run one stage. Only [`Stage::Click`] yields a record.
    pub async fn run_stage(&self, stage: &Stage) -> Option<StepRecord> {
        match stage {
            Stage::Wait { label, duration } => {
                tracing::info!(wait = *label, secs = duration.as_secs(), "waiting");
                tokio::time::sleep(*duration).await;
                None
            }
            Stage::Challenge {
                frame_selector,
                settle,
            } => {
                let _ = self.solve_challenge(frame_selector, *settle).await;
                None
            }
            Stage::Click(step) => Some(StepRecord {
                name: step.name.clone(),
                outcome: self.run_step(step).await,
            }),
        }
    }

    /// Click `step`'s trigger until it disappears or attempts run out.
    ///
    /// Stray windows are closed before the first probe, so every step starts
    /// with only the canonical window open and focused.
    pub async fn run_step(&self, step: &FunnelStep) -> StepOutcome {
        self.reconcile_windows(&step.name).await;
        let mut clicks = 0;
        for attempt in 1..=step.max_attempts {
            match self.driver.is_visible(&step.selector).await {
                Ok(false) => {
                    tracing::info!(step = %step.name, attempt, clicks, "trigger not visible, step reached");
                    return StepOutcome::Reached { clicks };
                }
                Ok(true) => {
                    if self.attempt(step, attempt).await {
                        clicks += 1;
                    }
                    if let Ok(false) = self.driver.is_visible(&step.selector).await {
                        tracing::info!(step = %step.name, attempt, clicks, "step cleared");
                        return StepOutcome::Reached { clicks };
                    }
                }
                Err(e) => {
                    tracing::debug!(step = %step.name, attempt, error = %e, "visibility check failed");
                }
            }
            if attempt < step.max_attempts {
                tokio::time::sleep(self.plan.retry_delay).await;
            }
        }
        tracing::warn!(step = %step.name, attempts = step.max_attempts, "step gave up");
        StepOutcome::GaveUp {
            attempts: step.max_attempts,
        }
    }

    /// Strip overlays, click, settle, reconcile. Returns whether the click landed.
    async fn attempt(&self, step: &FunnelStep, attempt: u32) -> bool {
        if !self.plan.overlays.is_empty() {
            match self.driver.remove_elements(&self.plan.overlays).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "overlays removed"),
                Err(e) => tracing::debug!(error = %e, "overlay removal failed"),
            }
        }

        let clicked = match self.driver.click(&step.selector).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(step = %step.name, attempt, error = %e, "click failed");
                false
            }
        };

        tokio::time::sleep(step.settle).await;
        self.reconcile_windows(&step.name).await;
        clicked
    }

    /// Click the challenge iframe's checkbox region if the iframe is shown.
    pub async fn solve_challenge(&self, frame_selector: &str, settle: Duration) -> bool {
        match self.driver.is_visible(frame_selector).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("no challenge frame");
                return false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "challenge probe failed");
                return false;
            }
        }
        let clicked = match self.driver.click_frame(frame_selector).await {
            Ok(()) => {
                tracing::info!("challenge frame clicked");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "challenge click failed");
                false
            }
        };
        tokio::time::sleep(settle).await;
        self.reconcile_windows("challenge").await;
        clicked
    }

    async fn reconcile_windows(&self, stage: &str) {
        if let Err(e) = windows::reconcile(self.driver).await {
            tracing::warn!(stage, error = %e, "window reconcile failed");
        }
    }
}
