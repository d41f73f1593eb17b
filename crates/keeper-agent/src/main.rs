//! # lease-keeper
//!
//! Runs one unattended lease renewal: loads settings, launches Chrome, wires
//! the mailbox and notifier into the renewal engine, and exits non-zero if the
//! run aborted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keeper_browser::{BrowserSession, LaunchOptions};
use keeper_core::{BrowserError, Mailbox, Notifier, RenewalOutcome, Report};
use keeper_mail::{CodeChannel, ImapConfig, ImapMailbox};
use keeper_renewal::{Orchestrator, RenewalPlan};
use keeper_settings::KeeperSettings;

/// Unattended hosting-lease renewal.
#[derive(Parser, Debug)]
#[command(name = "lease-keeper", about = "Renew a hosting lease unattended")]
struct Cli {
    /// Settings file (defaults to `~/.lease-keeper/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Chrome/Chromium executable (overrides settings and `CHROME_PATH`).
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Only send the terminal report.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn apply(&self, settings: &mut KeeperSettings) {
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.headed {
            settings.browser.headless = false;
        }
        if self.no_progress {
            settings.notify.progress = false;
        }
    }
}

fn chrome_path(cli: &Cli, settings: &KeeperSettings) -> Result<PathBuf> {
    let explicit = cli
        .chrome
        .clone()
        .or_else(|| settings.browser.chrome_path.as_ref().map(PathBuf::from));
    keeper_browser::find_chrome(explicit.as_deref())
        .ok_or_else(|| BrowserError::ChromeNotFound.into())
}

/// Terminal report for a run cut short by Ctrl-C.
async fn report_interrupted(notifier: &dyn Notifier) {
    let report = Report::outcome(
        RenewalOutcome::Failed {
            reason: "interrupted".into(),
        },
        "Run interrupted before it finished",
        None,
    );
    if let Err(e) = notifier.notify(&report).await {
        tracing::warn!(error = %e, "interrupt report failed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(keeper_settings::settings_path);
    let mut settings = keeper_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    cli.apply(&mut settings);

    if settings.logging.json {
        keeper_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        keeper_core::logging::init_subscriber(&settings.logging.level);
    }

    let credentials = settings
        .credentials()
        .context("Account credentials are incomplete")?;

    let artifact_dir = settings.artifact_path();
    std::fs::create_dir_all(&artifact_dir)
        .with_context(|| format!("Failed to create directory: {}", artifact_dir.display()))?;

    let chrome = chrome_path(&cli, &settings)?;
    tracing::info!(
        path = %chrome.display(),
        headless = settings.browser.headless,
        "launching chrome"
    );
    let session = Arc::new(
        BrowserSession::launch(&LaunchOptions {
            chrome_path: chrome,
            headless: settings.browser.headless,
            window_size: settings.browser.window_size.clone(),
            user_agent: settings.browser.user_agent.clone(),
        })
        .await
        .context("Failed to launch browser")?,
    );

    let mailbox = Arc::new(ImapMailbox::new(
        ImapConfig::from(&settings.mail),
        credentials.clone(),
    ));
    let codes = CodeChannel::new(
        Arc::clone(&mailbox) as Arc<dyn Mailbox>,
        settings.mail.sender.clone(),
    );
    let notifier = keeper_notify::from_settings(&settings.notify, credentials.account());

    let orchestrator = Orchestrator::new(
        session.clone(),
        codes,
        Arc::clone(&notifier),
        credentials,
        RenewalPlan::from_settings(&settings),
    );

    let result = tokio::select! {
        result = orchestrator.run() => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, shutting down");
            report_interrupted(notifier.as_ref()).await;
            Ok(None)
        }
    };
    drop(orchestrator);

    mailbox.logout().await;
    match Arc::try_unwrap(session) {
        Ok(session) => {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "browser close failed");
            }
        }
        Err(_) => tracing::debug!("browser still referenced, dropping"),
    }

    match result.context("Renewal run failed")? {
        Some(summary) => {
            tracing::info!(
                status = summary.outcome.status(),
                lease = %summary.lease.id,
                "done"
            );
            Ok(())
        }
        None => anyhow::bail!("Interrupted before the run finished"),
    }
}
