//! Renewal orchestrator: the state machine driving one unattended renewal.
//!
//! ```text
//! Login → OtpWait → OtpSubmit → LeaseDiscovery → Dashboard → EligibilityCheck
//!       → CooldownExit ─────────────────────────────────────────┐
//!       → Funnel → Verify ──────────────────────────────────────┴→ Report
//! ```
//!
//! Each state is one method returning the next state. Errors escaping a
//! state abort the run; [`Orchestrator::run`] catches them once, captures a
//! screenshot, sends a failure report, and returns the error.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use keeper_core::{
    BrowserDriver, Credentials, ExpirySnapshot, LeaseRef, Notifier, OneTimeCode, RenewalError,
    RenewalOutcome, Report,
};
use keeper_mail::CodeChannel;

use crate::eligibility::{self, ControlState, Eligibility};
use crate::expiry;
use crate::funnel::{Funnel, Stage, StepOutcome, StepRecord};
use crate::lease;
use crate::plan::RenewalPlan;

/// What a finished run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Terminal classification.
    pub outcome: RenewalOutcome,
    /// The lease that was processed.
    pub lease: LeaseRef,
    /// Expiry read before any renewal attempt.
    pub before: ExpirySnapshot,
    /// Expiry read after the funnel; `None` when the run stopped at cooldown.
    pub after: Option<ExpirySnapshot>,
    /// Clickable funnel steps in execution order.
    pub steps: Vec<StepRecord>,
    /// Body of the terminal report.
    pub message: String,
    /// Screenshot attached to the terminal report.
    pub artifact: Option<PathBuf>,
}

/// States of one run.
#[derive(Debug)]
pub enum RunState {
    /// Open the login page and request a code.
    Login,
    /// Wait for the emailed code.
    OtpWait,
    /// Enter the code.
    OtpSubmit(OneTimeCode),
    /// Find the lease dashboard link.
    LeaseDiscovery,
    /// Open the lease dashboard.
    Dashboard(LeaseRef),
    /// Read the expiry and inspect the renewal control.
    EligibilityCheck(LeaseRef),
    /// The control is cooling down; stop without touching the funnel.
    CooldownExit {
        /// Lease being processed.
        lease: LeaseRef,
        /// Expiry as read on the dashboard.
        before: ExpirySnapshot,
    },
    /// Walk the interstitial funnel behind the control.
    Funnel {
        /// Lease being processed.
        lease: LeaseRef,
        /// Expiry as read on the dashboard.
        before: ExpirySnapshot,
        /// Funnel entry link.
        href: String,
    },
    /// Re-read the dashboard and classify.
    Verify {
        /// Lease being processed.
        lease: LeaseRef,
        /// Expiry as read before the funnel.
        before: ExpirySnapshot,
        /// Funnel results; empty when the funnel was skipped.
        steps: Vec<StepRecord>,
    },
    /// Deliver the terminal report.
    Report(RunSummary),
}

impl RunState {
    /// State name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::OtpWait => "otp_wait",
            Self::OtpSubmit(_) => "otp_submit",
            Self::LeaseDiscovery => "lease_discovery",
            Self::Dashboard(_) => "dashboard",
            Self::EligibilityCheck(_) => "eligibility_check",
            Self::CooldownExit { .. } => "cooldown_exit",
            Self::Funnel { .. } => "funnel",
            Self::Verify { .. } => "verify",
            Self::Report(_) => "report",
        }
    }
}

/// Drives one renewal run end to end.
pub struct Orchestrator {
    driver: Arc<dyn BrowserDriver>,
    codes: CodeChannel,
    notifier: Arc<dyn Notifier>,
    credentials: Credentials,
    plan: RenewalPlan,
}

impl Orchestrator {
    /// Wire an orchestrator from its collaborators.
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        codes: CodeChannel,
        notifier: Arc<dyn Notifier>,
        credentials: Credentials,
        plan: RenewalPlan,
    ) -> Self {
        Self {
            driver,
            codes,
            notifier,
            credentials,
            plan,
        }
    }

    /// Run to completion. Exactly one terminal report is sent either way.
    pub async fn run(&self) -> Result<RunSummary, RenewalError> {
        let span = tracing::info_span!("renewal", account = self.credentials.account());
        async {
            match self.drive().await {
                Ok(summary) => Ok(summary),
                Err(e) => {
                    self.fail(&e).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self) -> Result<RunSummary, RenewalError> {
        let mut state = RunState::Login;
        loop {
            tracing::debug!(state = state.name(), "entering state");
            state = match state {
                RunState::Login => self.login().await?,
                RunState::OtpWait => self.otp_wait().await?,
                RunState::OtpSubmit(code) => self.otp_submit(&code).await?,
                RunState::LeaseDiscovery => self.lease_discovery().await?,
                RunState::Dashboard(lease) => self.dashboard(lease).await?,
                RunState::EligibilityCheck(lease) => self.eligibility_check(lease).await?,
                RunState::CooldownExit { lease, before } => self.cooldown_exit(lease, before).await,
                RunState::Funnel {
                    lease,
                    before,
                    href,
                } => self.funnel(lease, before, &href).await,
                RunState::Verify {
                    lease,
                    before,
                    steps,
                } => self.verify(lease, before, steps).await,
                RunState::Report(summary) => {
                    self.report(&summary).await;
                    return Ok(summary);
                }
            };
        }
    }

    // ─── States ──────────────────────────────────────────────────────────

    async fn login(&self) -> Result<RunState, RenewalError> {
        let plan = &self.plan;
        tracing::info!(url = %plan.login_url, "opening login page");
        self.driver
            .navigate(&plan.login_url)
            .await
            .map_err(RenewalError::LoginUnreachable)?;
        tokio::time::sleep(plan.login_settle).await;
        self.progress("Login page opened", "step1_login_page.png").await;

        match self.driver.solve_bot_check().await {
            Ok(true) => tracing::info!("bot check clicked on login page"),
            Ok(false) => tracing::debug!("no bot check on login page"),
            Err(e) => tracing::warn!(error = %e, "bot check attempt failed"),
        }

        self.driver
            .wait_for_visible(&plan.identifier_selector, plan.identifier_timeout)
            .await?;
        self.driver
            .type_slowly(
                &plan.identifier_selector,
                self.credentials.account(),
                plan.typing_delay,
            )
            .await?;
        self.driver.press_enter(&plan.identifier_selector).await?;
        tracing::info!("identifier submitted, code requested");
        self.progress("Email submitted, code requested", "step2_email_submitted.png")
            .await;
        tokio::time::sleep(plan.login_settle).await;
        Ok(RunState::OtpWait)
    }

    async fn otp_wait(&self) -> Result<RunState, RenewalError> {
        let code = self
            .codes
            .fetch_code(&self.credentials, self.plan.poll)
            .await
            .map_err(RenewalError::CodeTimeout)?;
        Ok(RunState::OtpSubmit(code))
    }

    async fn otp_submit(&self, code: &OneTimeCode) -> Result<RunState, RenewalError> {
        self.driver
            .type_slowly(&self.plan.otp_selector, code.as_str(), std::time::Duration::ZERO)
            .await?;
        tokio::time::sleep(self.plan.otp_settle).await;
        self.progress("One-time code entered", "step3_after_otp.png").await;
        Ok(RunState::LeaseDiscovery)
    }

    async fn lease_discovery(&self) -> Result<RunState, RenewalError> {
        let plan = &self.plan;
        let mut leases = self.lease_links().await;
        if leases.is_empty() {
            tracing::info!(url = %plan.home_url, "no lease on landing page, trying panel home");
            self.driver.navigate(&plan.home_url).await?;
            tokio::time::sleep(plan.login_settle).await;
            leases = self.lease_links().await;
        }

        let lease = lease::select(leases, plan.lease_id.as_deref()).ok_or_else(|| {
            RenewalError::LeaseNotFound(format!(
                "no link matching {} on landing page or {}",
                plan.lease_link_selector, plan.home_url
            ))
        })?;
        tracing::info!(lease = %lease.id, "lease discovered");
        Ok(RunState::Dashboard(lease))
    }

    async fn dashboard(&self, lease: LeaseRef) -> Result<RunState, RenewalError> {
        self.driver.navigate(&lease.dashboard_url).await?;
        tokio::time::sleep(self.plan.dashboard_settle).await;
        self.progress("Lease dashboard opened", "step4_server_dashboard.png")
            .await;
        Ok(RunState::EligibilityCheck(lease))
    }

    async fn eligibility_check(&self, lease: LeaseRef) -> Result<RunState, RenewalError> {
        let plan = &self.plan;
        let before = expiry::read_from_page(self.driver.as_ref(), &plan.expiry_text_selector).await;
        tracing::info!(expiry = %before, "expiry before renewal");

        let control = self.control_state().await;
        match eligibility::assess(control.as_ref(), &plan.markers) {
            Eligibility::CoolingDown => {
                tracing::warn!("renewal control is cooling down");
                Ok(RunState::CooldownExit { lease, before })
            }
            Eligibility::Indeterminate => {
                tracing::warn!("renewal control not found, skipping funnel");
                Ok(RunState::Verify {
                    lease,
                    before,
                    steps: Vec::new(),
                })
            }
            Eligibility::Eligible => match self.control_href().await {
                Some(href) => {
                    tracing::info!(href = %href, "renewal control eligible");
                    Ok(RunState::Funnel {
                        lease,
                        before,
                        href,
                    })
                }
                None => {
                    tracing::warn!("renewal control has no link, skipping funnel");
                    Ok(RunState::Verify {
                        lease,
                        before,
                        steps: Vec::new(),
                    })
                }
            },
        }
    }

    async fn cooldown_exit(&self, lease: LeaseRef, before: ExpirySnapshot) -> RunState {
        let artifact = self.capture("cooldown.png").await;
        RunState::Report(RunSummary {
            outcome: RenewalOutcome::Cooldown,
            message: format!("Renewal control is cooling down. Remaining: {before}"),
            lease,
            before,
            after: None,
            steps: Vec::new(),
            artifact,
        })
    }

    async fn funnel(&self, lease: LeaseRef, before: ExpirySnapshot, href: &str) -> RunState {
        if let Err(e) = self.driver.navigate(href).await {
            tracing::warn!(error = %e, "could not open renewal link");
            return RunState::Verify {
                lease,
                before,
                steps: Vec::new(),
            };
        }
        tokio::time::sleep(self.plan.funnel_entry_settle).await;
        self.progress("Renewal link opened", "step5_renew_url_opened.png")
            .await;

        let funnel = Funnel::new(self.driver.as_ref(), &self.plan.funnel);
        let mut steps = Vec::new();
        for stage in &self.plan.funnel.stages {
            let Some(record) = funnel.run_stage(stage).await else {
                continue;
            };
            if let (Stage::Click(step), StepOutcome::Reached { clicks: 1.. }) =
                (stage, record.outcome)
            {
                self.progress(
                    &format!("Funnel step '{}' cleared", step.name),
                    &format!("step_{}_done.png", step.name),
                )
                .await;
            }
            steps.push(record);
        }
        RunState::Verify {
            lease,
            before,
            steps,
        }
    }

    async fn verify(
        &self,
        lease: LeaseRef,
        before: ExpirySnapshot,
        steps: Vec<StepRecord>,
    ) -> RunState {
        if let Err(e) = self.driver.navigate(&lease.dashboard_url).await {
            tracing::warn!(error = %e, "could not reopen dashboard for verification");
        }
        tokio::time::sleep(self.plan.dashboard_settle).await;
        let after =
            expiry::read_from_page(self.driver.as_ref(), &self.plan.expiry_text_selector).await;
        tracing::info!(before = %before, after = %after, "expiry after renewal");
        let artifact = self.capture("final_result.png").await;

        // The final trigger must have been shown, clicked, and cleared.
        let renewed = steps
            .last()
            .is_some_and(|s| matches!(s.outcome, StepOutcome::Reached { clicks: 1.. }));
        let (outcome, message) = if renewed {
            (
                RenewalOutcome::Renewed,
                format!("Renewed. Before: {before}\nAfter: {after}"),
            )
        } else {
            (
                RenewalOutcome::IncompleteVerified,
                format!("Finished without confirmation, please check. Before: {before}\nNow: {after}"),
            )
        };
        RunState::Report(RunSummary {
            outcome,
            lease,
            before,
            after: Some(after),
            steps,
            message,
            artifact,
        })
    }

    async fn report(&self, summary: &RunSummary) {
        tracing::info!(status = summary.outcome.status(), "run finished");
        self.notify_quietly(&Report::outcome(
            summary.outcome.clone(),
            summary.message.clone(),
            summary.artifact.clone(),
        ))
        .await;
    }

    async fn fail(&self, error: &RenewalError) {
        tracing::error!(error = %error, "run aborted");
        let artifact = self.capture("error.png").await;
        let reason = error.to_string();
        self.notify_quietly(&Report::outcome(
            RenewalOutcome::Failed {
                reason: reason.clone(),
            },
            format!("Error: `{reason}`"),
            artifact,
        ))
        .await;
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    async fn lease_links(&self) -> Vec<LeaseRef> {
        match self
            .driver
            .attribute_all(&self.plan.lease_link_selector, "href")
            .await
        {
            Ok(hrefs) => lease::parse_links(&hrefs),
            Err(e) => {
                tracing::warn!(error = %e, "could not read lease links");
                Vec::new()
            }
        }
    }

    /// Class tokens of the renewal control, or `None` when it is not shown.
    async fn control_state(&self) -> Option<ControlState> {
        let selector = &self.plan.renew_control_selector;
        match self.driver.is_visible(selector).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "could not probe renewal control");
                return None;
            }
        }
        match self.driver.attribute(selector, "class").await {
            Ok(class) => Some(ControlState::from_class_attr(class.as_deref().unwrap_or(""))),
            Err(e) => {
                tracing::warn!(error = %e, "could not read renewal control class");
                None
            }
        }
    }

    async fn control_href(&self) -> Option<String> {
        match self
            .driver
            .attribute_all(&self.plan.renew_control_selector, "href")
            .await
        {
            Ok(hrefs) => hrefs.into_iter().find(|h| !h.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read renewal link");
                None
            }
        }
    }

    /// Best-effort screenshot into the artifact directory.
    async fn capture(&self, name: &str) -> Option<PathBuf> {
        let path = self.plan.artifact_dir.join(name);
        match self.driver.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(file = name, error = %e, "screenshot failed");
                None
            }
        }
    }

    async fn progress(&self, message: &str, shot: &str) {
        if !self.plan.progress {
            return;
        }
        let artifact = self.capture(shot).await;
        self.notify_quietly(&Report::progress(message, artifact)).await;
    }

    async fn notify_quietly(&self, report: &Report) {
        if let Err(e) = self.notifier.notify(report).await {
            tracing::warn!(status = report.status(), error = %e, "notification failed");
        }
    }
}
