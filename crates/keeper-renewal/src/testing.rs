//! In-memory fakes for the engine's collaborators.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use keeper_core::{
    BrowserDriver, BrowserError, MailError, Mailbox, MessageId, NotifyError, Notifier, Report,
    WindowId,
};

const CANONICAL: &str = "main";

#[derive(Clone, Copy)]
enum Visibility {
    Always,
    UntilClicks(u32),
}

#[derive(Default)]
struct PageState {
    url: Option<String>,
    visible: HashMap<String, Visibility>,
    clicks_on: HashMap<String, u32>,
    attributes: HashMap<(String, String), String>,
    links: HashMap<String, Vec<String>>,
    texts: VecDeque<Vec<String>>,
    failing_urls: HashSet<String>,
    failing_clicks: HashSet<String>,
    spawn_on_click: HashMap<String, usize>,
    windows: Vec<String>,
    vanishing: HashSet<String>,
    focused: Option<String>,
    bot_check: bool,
    bot_check_fails: bool,
    spawned: usize,

    navigations: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    enters: Vec<String>,
    overlay_sweeps: usize,
    frame_clicks: Vec<String>,
    bot_checks: usize,
    screenshots: Vec<PathBuf>,
}

/// Scriptable page model. Selectors are matched literally.
pub(crate) struct FakeBrowser {
    state: Mutex<PageState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                windows: vec![CANONICAL.to_string()],
                ..PageState::default()
            }),
        }
    }

    pub fn show(&self, selector: &str) -> &Self {
        let _ = self
            .state
            .lock()
            .visible
            .insert(selector.into(), Visibility::Always);
        self
    }

    /// Visible until clicked `clicks` times.
    pub fn show_until_clicks(&self, selector: &str, clicks: u32) -> &Self {
        let _ = self
            .state
            .lock()
            .visible
            .insert(selector.into(), Visibility::UntilClicks(clicks));
        self
    }

    pub fn set_attribute(&self, selector: &str, name: &str, value: &str) -> &Self {
        let _ = self
            .state
            .lock()
            .attributes
            .insert((selector.into(), name.into()), value.into());
        self
    }

    /// `href`s returned for any `attribute_all` call while `url` is loaded.
    pub fn set_links(&self, url: &str, hrefs: &[&str]) -> &Self {
        let _ = self
            .state
            .lock()
            .links
            .insert(url.into(), hrefs.iter().map(|h| (*h).to_string()).collect());
        self
    }

    /// Successive `text_blocks` results; the last one repeats.
    pub fn queue_text(&self, blocks: &[&str]) -> &Self {
        self.state
            .lock()
            .texts
            .push_back(blocks.iter().map(|b| (*b).to_string()).collect());
        self
    }

    pub fn fail_navigation(&self, url: &str) -> &Self {
        let _ = self.state.lock().failing_urls.insert(url.into());
        self
    }

    pub fn fail_click(&self, selector: &str) -> &Self {
        let _ = self.state.lock().failing_clicks.insert(selector.into());
        self
    }

    pub fn spawn_on_click(&self, selector: &str, windows: usize) -> &Self {
        let _ = self
            .state
            .lock()
            .spawn_on_click
            .insert(selector.into(), windows);
        self
    }

    pub fn with_bot_check(&self) -> &Self {
        self.state.lock().bot_check = true;
        self
    }

    pub fn fail_bot_check(&self) -> &Self {
        self.state.lock().bot_check_fails = true;
        self
    }

    pub fn open_windows(&self, ids: &[&str]) {
        self.state
            .lock()
            .windows
            .extend(ids.iter().map(|id| (*id).to_string()));
    }

    /// `id` disappears by itself when a close is attempted.
    pub fn vanish_on_close(&self, id: &str) {
        let _ = self.state.lock().vanishing.insert(id.into());
    }

    pub fn window_ids(&self) -> Vec<String> {
        self.state.lock().windows.clone()
    }

    pub fn focused(&self) -> Option<String> {
        self.state.lock().focused.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().typed.clone()
    }

    pub fn enters(&self) -> Vec<String> {
        self.state.lock().enters.clone()
    }

    pub fn overlay_sweeps(&self) -> usize {
        self.state.lock().overlay_sweeps
    }

    pub fn frame_clicks(&self) -> Vec<String> {
        self.state.lock().frame_clicks.clone()
    }

    pub fn bot_checks(&self) -> usize {
        self.state.lock().bot_checks
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().screenshots.clone()
    }
}

impl PageState {
    fn visible(&self, selector: &str) -> bool {
        match self.visible.get(selector) {
            Some(Visibility::Always) => true,
            Some(Visibility::UntilClicks(n)) => {
                self.clicks_on.get(selector).copied().unwrap_or(0) < *n
            }
            None => false,
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut s = self.state.lock();
        s.navigations.push(url.into());
        if s.failing_urls.contains(url) {
            return Err(BrowserError::NavigationFailed {
                url: url.into(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }
        s.url = Some(url.into());
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.state.lock().visible(selector))
    }

    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        if self.state.lock().visible(selector) {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(BrowserError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            context: format!("waiting for {selector}"),
        })
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let mut s = self.state.lock();
        if s.failing_clicks.contains(selector) || !s.visible(selector) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.into(),
            });
        }
        s.clicks.push(selector.into());
        *s.clicks_on.entry(selector.into()).or_insert(0) += 1;
        let spawn = s.spawn_on_click.get(selector).copied().unwrap_or(0);
        for _ in 0..spawn {
            s.spawned += 1;
            let id = format!("popup-{}", s.spawned);
            s.windows.push(id);
        }
        Ok(())
    }

    async fn type_slowly(
        &self,
        selector: &str,
        text: &str,
        _per_char: Duration,
    ) -> Result<(), BrowserError> {
        self.state.lock().typed.push((selector.into(), text.into()));
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<(), BrowserError> {
        self.state.lock().enters.push(selector.into());
        Ok(())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        let s = self.state.lock();
        if !s.visible.contains_key(selector) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.into(),
            });
        }
        Ok(s.attributes.get(&(selector.into(), name.into())).cloned())
    }

    async fn attribute_all(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let s = self.state.lock();
        if name == "href" {
            if let Some(links) = s.url.as_ref().and_then(|u| s.links.get(u)) {
                return Ok(links.clone());
            }
        }
        Ok(s
            .attributes
            .get(&(selector.into(), name.into()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn text_blocks(&self, _selector: &str) -> Result<Vec<String>, BrowserError> {
        let mut s = self.state.lock();
        let blocks = if s.texts.len() > 1 {
            s.texts.pop_front()
        } else {
            s.texts.front().cloned()
        };
        Ok(blocks.unwrap_or_default())
    }

    async fn remove_elements(&self, _selectors: &[String]) -> Result<usize, BrowserError> {
        self.state.lock().overlay_sweeps += 1;
        Ok(0)
    }

    async fn click_frame(&self, frame_selector: &str) -> Result<(), BrowserError> {
        self.state.lock().frame_clicks.push(frame_selector.into());
        Ok(())
    }

    async fn solve_bot_check(&self) -> Result<bool, BrowserError> {
        let mut s = self.state.lock();
        s.bot_checks += 1;
        if s.bot_check_fails {
            return Err(BrowserError::Cdp("Runtime.evaluate: target closed".into()));
        }
        Ok(s.bot_check)
    }

    async fn windows(&self) -> Result<Vec<WindowId>, BrowserError> {
        Ok(self
            .state
            .lock()
            .windows
            .iter()
            .cloned()
            .map(WindowId)
            .collect())
    }

    fn canonical_window(&self) -> WindowId {
        WindowId(CANONICAL.into())
    }

    async fn close_window(&self, window: &WindowId) -> Result<(), BrowserError> {
        let mut s = self.state.lock();
        let before = s.windows.len();
        s.windows.retain(|w| *w != window.0);
        if s.windows.len() == before || s.vanishing.contains(&window.0) {
            return Err(BrowserError::WindowNotFound {
                window: window.0.clone(),
            });
        }
        Ok(())
    }

    async fn focus_window(&self, window: &WindowId) -> Result<(), BrowserError> {
        self.state.lock().focused = Some(window.0.clone());
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        self.state.lock().screenshots.push(path.to_path_buf());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mail / notify
// ─────────────────────────────────────────────────────────────────────────────

/// Mailbox holding a fixed set of raw messages.
#[derive(Default)]
pub(crate) struct FakeMailbox {
    messages: Mutex<Vec<(u32, String, bool)>>,
}

impl FakeMailbox {
    pub fn with_code(code: &str) -> Self {
        let mailbox = Self::default();
        mailbox.messages.lock().push((
            1,
            format!("From: Pella\r\nContent-Type: text/plain\r\n\r\nYour code is {code}\r\n"),
            false,
        ));
        mailbox
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn search_unseen_from(&self, _sender: &str) -> Result<Vec<MessageId>, MailError> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|(_, _, seen)| !seen)
            .map(|(id, _, _)| MessageId(*id))
            .collect())
    }

    async fn fetch_raw(&self, id: MessageId) -> Result<Vec<u8>, MailError> {
        self.messages
            .lock()
            .iter()
            .find(|(i, _, _)| *i == id.0)
            .map(|(_, body, _)| body.clone().into_bytes())
            .ok_or(MailError::Parse {
                id: id.0,
                reason: "missing".into(),
            })
    }

    async fn mark_seen(&self, id: MessageId) -> Result<(), MailError> {
        for m in self.messages.lock().iter_mut().filter(|(i, _, _)| *i == id.0) {
            m.2 = true;
        }
        Ok(())
    }
}

/// Records every report; optionally fails every delivery.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    reports: Mutex<Vec<Report>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        self.reports.lock().push(report.clone());
        if self.fail {
            return Err(NotifyError::Transport("offline".into()));
        }
        Ok(())
    }
}
