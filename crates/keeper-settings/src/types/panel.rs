use serde::{Deserialize, Serialize};

/// Target panel URLs, selectors, and settle delays.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelSettings {
    /// Login page.
    pub login_url: String,
    /// Authenticated landing page listing the account's leases.
    pub home_url: String,
    /// Selector for links into individual lease dashboards.
    pub lease_link_selector: String,
    /// Preferred lease id when the account has several.
    pub lease_id: Option<String>,
    /// Email/identifier input on the login page.
    pub identifier_selector: String,
    /// One-time-code input.
    pub otp_selector: String,
    /// Anchor whose `href` enters the renewal funnel.
    pub renew_control_selector: String,
    /// Text blocks scanned for the expiry line.
    pub expiry_text_selector: String,
    /// Delay between typed characters of the identifier.
    pub typing_delay_ms: u64,
    /// How long to wait for the identifier field.
    pub identifier_timeout_ms: u64,
    /// Settle after opening the login page and after submitting the identifier.
    pub login_settle_ms: u64,
    /// Settle after submitting the one-time code.
    pub otp_settle_ms: u64,
    /// Settle after opening the lease dashboard.
    pub dashboard_settle_ms: u64,
    /// Settle after opening the funnel entry URL.
    pub funnel_entry_settle_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            login_url: "https://www.pella.app/login".to_string(),
            home_url: "https://www.pella.app/home".to_string(),
            lease_link_selector: r#"a[href*="/server/"]"#.to_string(),
            lease_id: None,
            identifier_selector: "#identifier-field".to_string(),
            otp_selector: r#"input[data-input-otp="true"]"#.to_string(),
            renew_control_selector: r#"a[href*="cuty.io"]"#.to_string(),
            expiry_text_selector: "div".to_string(),
            typing_delay_ms: 100,
            identifier_timeout_ms: 25_000,
            login_settle_ms: 5_000,
            otp_settle_ms: 10_000,
            dashboard_settle_ms: 10_000,
            funnel_entry_settle_ms: 5_000,
        }
    }
}

/// Interstitial funnel selectors, retry budgets, and delays.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunnelSettings {
    /// First "continue" button.
    pub continue_selector: String,
    /// Attempts for the continue step.
    pub continue_attempts: u32,
    /// Challenge iframe clicked between continue and robot steps.
    pub challenge_frame_selector: String,
    /// Wait before probing for the challenge iframe.
    pub pre_challenge_ms: u64,
    /// Wait after clicking the challenge iframe.
    pub challenge_settle_ms: u64,
    /// "I am not a robot" confirmation button.
    pub robot_selector: String,
    /// Attempts for the robot step.
    pub robot_attempts: u32,
    /// Mandatory wait imposed by the target before the reveal button works.
    pub reveal_wait_ms: u64,
    /// Final reveal/confirm button.
    pub reveal_selector: String,
    /// Attempts for the reveal step.
    pub reveal_attempts: u32,
    /// Wait after each click before checking for pop-ups and the trigger.
    pub click_settle_ms: u64,
    /// Wait between attempts that did not clear the trigger.
    pub retry_delay_ms: u64,
    /// Third-party overlays removed before every click.
    pub overlay_selectors: Vec<String>,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            continue_selector: r#"button#submit-button[data-ref="first"]"#.to_string(),
            continue_attempts: 5,
            challenge_frame_selector: r#"iframe[src*="cloudflare"]"#.to_string(),
            pre_challenge_ms: 5_000,
            challenge_settle_ms: 6_000,
            robot_selector: r#"button#submit-button[data-ref="captcha"]"#.to_string(),
            robot_attempts: 8,
            reveal_wait_ms: 18_000,
            reveal_selector: r#"button#submit-button[data-ref="show"]"#.to_string(),
            reveal_attempts: 8,
            click_settle_ms: 3_000,
            retry_delay_ms: 1_000,
            overlay_selectors: vec![
                r#"iframe[src*="googlesyndication"]"#.to_string(),
                r#"iframe[id^="aswift"]"#.to_string(),
                "ins.adsbygoogle".to_string(),
                r#"div[id^="google_ads"]"#.to_string(),
            ],
        }
    }
}

/// Class tokens used to infer the renewal control's cooldown state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateSettings {
    /// Token rendered while the control is dimmed.
    pub dimmed_token: String,
    /// Token that disables pointer interaction.
    pub no_pointer_token: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            dimmed_token: "opacity-50".to_string(),
            no_pointer_token: "pointer-events-none".to_string(),
        }
    }
}
