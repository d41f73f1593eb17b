//! Notifier that only writes reports to the tracing log.

use async_trait::async_trait;

use keeper_core::{NotifyError, Notifier, Report, ReportKind};

/// Used when no chat channel is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        let artifact = report.artifact.as_ref().map(|p| p.display().to_string());
        match &report.kind {
            ReportKind::Progress => {
                tracing::info!(artifact = ?artifact, "progress: {}", report.message);
            }
            ReportKind::Outcome(outcome) if outcome.is_success() => {
                tracing::info!(status = outcome.status(), artifact = ?artifact, "{}", report.message);
            }
            ReportKind::Outcome(outcome) => {
                tracing::warn!(status = outcome.status(), artifact = ?artifact, "{}", report.message);
            }
        }
        Ok(())
    }
}
