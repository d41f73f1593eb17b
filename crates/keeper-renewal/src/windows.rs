//! Window reconciliation.
//!
//! Third-party funnel pages open pop-ups on click. After any such action the
//! session must again have exactly one window, the canonical one, focused.

use keeper_core::{BrowserDriver, BrowserError};

/// Close every non-canonical window and refocus the canonical one.
///
/// Returns how many windows were closed. Windows that vanish on their own
/// between listing and closing are not errors.
pub async fn reconcile(driver: &dyn BrowserDriver) -> Result<usize, BrowserError> {
    let canonical = driver.canonical_window();
    let windows = driver.windows().await?;

    let mut closed = 0;
    for window in windows.iter().filter(|w| **w != canonical) {
        match driver.close_window(window).await {
            Ok(()) => closed += 1,
            Err(BrowserError::WindowNotFound { .. }) => {}
            Err(e) => tracing::warn!(window = %window, error = %e, "could not close window"),
        }
    }
    if closed > 0 {
        tracing::debug!(closed, "closed auxiliary windows");
    }

    driver.focus_window(&canonical).await?;
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;

    #[tokio::test]
    async fn closes_all_but_canonical() {
        let browser = FakeBrowser::new();
        browser.open_windows(&["popup-1", "popup-2"]);

        let closed = reconcile(&browser).await.unwrap();
        assert_eq!(closed, 2);
        assert_eq!(browser.window_ids(), vec!["main".to_string()]);
        assert_eq!(browser.focused(), Some("main".to_string()));
    }

    #[tokio::test]
    async fn single_window_is_noop_but_refocuses() {
        let browser = FakeBrowser::new();
        assert_eq!(reconcile(&browser).await.unwrap(), 0);
        assert_eq!(browser.focused(), Some("main".to_string()));
    }

    #[tokio::test]
    async fn window_gone_before_close_is_tolerated() {
        let browser = FakeBrowser::new();
        browser.open_windows(&["ghost"]);
        browser.vanish_on_close("ghost");

        assert_eq!(reconcile(&browser).await.unwrap(), 0);
        assert_eq!(browser.window_ids(), vec!["main".to_string()]);
    }
}
