//! Everything a run needs to know, resolved from settings once.

use std::path::PathBuf;
use std::time::Duration;

use keeper_mail::PollBudget;
use keeper_settings::KeeperSettings;

use crate::eligibility::GateMarkers;
use crate::funnel::FunnelPlan;

/// Selectors, timings, and retry budgets for one renewal run.
#[derive(Clone, Debug)]
pub struct RenewalPlan {
    /// Login page.
    pub login_url: String,
    /// Panel home, retried once when the landing page lists no lease.
    pub home_url: String,
    /// Links to lease dashboards.
    pub lease_link_selector: String,
    /// Lease to renew when several are listed.
    pub lease_id: Option<String>,
    /// Account identifier input.
    pub identifier_selector: String,
    /// One-time code input.
    pub otp_selector: String,
    /// Renewal control on the dashboard.
    pub renew_control_selector: String,
    /// Elements whose text may state the expiry.
    pub expiry_text_selector: String,

    /// Pause between typed characters of the account identifier.
    pub typing_delay: Duration,
    /// How long the identifier input may take to appear.
    pub identifier_timeout: Duration,
    /// Pause after opening the login page and after requesting a code.
    pub login_settle: Duration,
    /// Pause after entering the code.
    pub otp_settle: Duration,
    /// Pause after opening a dashboard.
    pub dashboard_settle: Duration,
    /// Pause after opening the funnel entry link.
    pub funnel_entry_settle: Duration,

    /// Code polling budget.
    pub poll: PollBudget,
    /// Funnel stages.
    pub funnel: FunnelPlan,
    /// Cooldown markers.
    pub markers: GateMarkers,

    /// Directory screenshots are written to.
    pub artifact_dir: PathBuf,
    /// Send a progress report at each milestone.
    pub progress: bool,
}

impl RenewalPlan {
    /// Resolve a plan from loaded settings.
    pub fn from_settings(settings: &KeeperSettings) -> Self {
        let panel = &settings.panel;
        let ms = Duration::from_millis;
        Self {
            login_url: panel.login_url.clone(),
            home_url: panel.home_url.clone(),
            lease_link_selector: panel.lease_link_selector.clone(),
            lease_id: panel.lease_id.clone().filter(|id| !id.is_empty()),
            identifier_selector: panel.identifier_selector.clone(),
            otp_selector: panel.otp_selector.clone(),
            renew_control_selector: panel.renew_control_selector.clone(),
            expiry_text_selector: panel.expiry_text_selector.clone(),
            typing_delay: ms(panel.typing_delay_ms),
            identifier_timeout: ms(panel.identifier_timeout_ms),
            login_settle: ms(panel.login_settle_ms),
            otp_settle: ms(panel.otp_settle_ms),
            dashboard_settle: ms(panel.dashboard_settle_ms),
            funnel_entry_settle: ms(panel.funnel_entry_settle_ms),
            poll: PollBudget::from_settings(&settings.mail),
            funnel: FunnelPlan::from_settings(&settings.funnel),
            markers: GateMarkers::from(&settings.gate),
            artifact_dir: settings.artifact_path(),
            progress: settings.notify.progress,
        }
    }
}

impl Default for RenewalPlan {
    fn default() -> Self {
        Self::from_settings(&KeeperSettings::default())
    }
}
