//! CDP browser session: a thin client over `tokio-tungstenite`.
//!
//! Only implements the CDP commands the renewal flow needs (not the entire protocol).
//! Page-level commands go over the WebSocket of the canonical target; window
//! bookkeeping (listing, closing, activating other targets) uses the DevTools
//! HTTP endpoints on the same debugging port.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use keeper_core::{BrowserError, WindowId};

use crate::script;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reply slot for one in-flight command.
type PendingTx = oneshot::Sender<Result<Value, String>>;

const CDP_TIMEOUT: Duration = Duration::from_secs(30);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How to launch Chrome.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    /// Chrome/Chromium executable.
    pub chrome_path: PathBuf,
    /// Run with `--headless=new`.
    pub headless: bool,
    /// `width,height`.
    pub window_size: String,
    /// Optional user-agent override.
    pub user_agent: Option<String>,
}

/// One entry of the DevTools `/json/list` endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// A single CDP browser session attached to the canonical page target.
pub struct BrowserSession {
    cmd_tx: mpsc::Sender<CdpCommand>,
    http: reqwest::Client,
    port: u16,
    canonical: WindowId,
    current_url: parking_lot::RwLock<Option<String>>,
    chrome_process: Mutex<Option<Child>>,
    _profile_dir: tempfile::TempDir,
    _handler: JoinHandle<()>,
}

/// A command queued for the handler task.
struct CdpCommand {
    method: String,
    params: Value,
    response_tx: PendingTx,
}

impl BrowserSession {
    /// Launch Chrome with a throwaway profile and connect via CDP WebSocket.
    pub async fn launch(opts: &LaunchOptions) -> Result<Self, BrowserError> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(|e| {
            BrowserError::LaunchFailed {
                context: format!("bind port: {e}"),
            }
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("local_addr: {e}"),
            })?
            .port();
        drop(listener);

        let profile_dir = tempfile::tempdir().map_err(|e| BrowserError::LaunchFailed {
            context: format!("profile dir: {e}"),
        })?;

        let mut cmd = Command::new(&opts.chrome_path);
        let _ = cmd
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--remote-debugging-port={port}"))
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .arg(format!("--window-size={}", opts.window_size));
        if opts.headless {
            let _ = cmd.arg("--headless=new");
        }
        if let Some(ua) = &opts.user_agent {
            let _ = cmd.arg(format!("--user-agent={ua}"));
        }
        let mut child = cmd
            .arg("about:blank")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed {
                context: e.to_string(),
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("http client: {e}"),
            })?;

        // Chrome has no page target until its DevTools endpoint is up
        let (target_id, ws_url) = wait_for_page_target(&http, port, &mut child).await?;

        let (ws, _) = connect_async(&ws_url)
            .await
            .map_err(|e| BrowserError::LaunchFailed {
                context: format!("WebSocket connect: {e}"),
            })?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<CdpCommand>(64);
        let handler = tokio::spawn(cdp_handler_loop(ws, cmd_rx));

        tracing::info!(port, target = %target_id, headless = opts.headless, "browser launched");

        let session = Self {
            cmd_tx,
            http,
            port,
            canonical: WindowId(target_id),
            current_url: parking_lot::RwLock::new(None),
            chrome_process: Mutex::new(Some(child)),
            _profile_dir: profile_dir,
            _handler: handler,
        };
        let _ = session.send_cdp("Page.enable", json!({})).await?;
        Ok(session)
    }

    /// Current page URL, as last navigated.
    pub fn current_url(&self) -> Option<String> {
        self.current_url.read().clone()
    }

    /// The target this session is attached to.
    pub fn canonical(&self) -> &WindowId {
        &self.canonical
    }

    // ─── CDP command helper ──────────────────────────────────────────────

    async fn send_cdp(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(CdpCommand {
                method: method.into(),
                params,
                response_tx: tx,
            })
            .await
            .map_err(|_| BrowserError::Cdp("handler closed".into()))?;

        let result = tokio::time::timeout(CDP_TIMEOUT, rx)
            .await
            .map_err(|_| BrowserError::Timeout {
                timeout_ms: millis(CDP_TIMEOUT),
                context: format!("CDP {method}"),
            })?
            .map_err(|_| BrowserError::Cdp("response dropped".into()))?;

        result.map_err(BrowserError::Cdp)
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Navigate to a URL and wait for `document.readyState` to reach `complete`.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .send_cdp("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.into(),
                reason: e.to_string(),
            })?;
        if let Some(error_text) = result["errorText"].as_str().filter(|t| !t.is_empty()) {
            return Err(BrowserError::NavigationFailed {
                url: url.into(),
                reason: error_text.into(),
            });
        }

        let deadline = tokio::time::Instant::now() + LOAD_TIMEOUT;
        loop {
            // The old document may be torn down mid-evaluate; treat that as "not ready".
            if let Ok(ready) = self.evaluate(script::READY).await {
                if ready.as_bool() == Some(true) {
                    break;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(url, "page load did not complete before timeout, continuing");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        *self.current_url.write() = Some(url.to_string());
        Ok(())
    }

    // ─── Interaction ─────────────────────────────────────────────────────

    /// Script click on an element by CSS selector.
    pub async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.ensure_element_exists(selector).await?;
        let _ = self.evaluate(&script::click(selector)).await?;
        Ok(())
    }

    /// Type text into an element, one key event pair per character.
    pub async fn type_text(
        &self,
        selector: &str,
        text: &str,
        per_char: Duration,
    ) -> Result<(), BrowserError> {
        self.ensure_element_exists(selector).await?;
        let _ = self.evaluate(&script::focus(selector)).await?;

        for ch in text.chars() {
            let _ = self
                .send_cdp(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": "keyDown",
                        "text": ch.to_string(),
                        "key": ch.to_string(),
                    }),
                )
                .await?;
            let _ = self
                .send_cdp(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": "keyUp",
                        "key": ch.to_string(),
                    }),
                )
                .await?;
            if !per_char.is_zero() {
                tokio::time::sleep(per_char).await;
            }
        }
        Ok(())
    }

    /// Focus an element and press Enter.
    pub async fn press_enter(&self, selector: &str) -> Result<(), BrowserError> {
        self.ensure_element_exists(selector).await?;
        let _ = self.evaluate(&script::focus(selector)).await?;
        let _ = self
            .send_cdp(
                "Input.dispatchKeyEvent",
                json!({
                    "type": "keyDown",
                    "key": "Enter",
                    "code": "Enter",
                    "text": "\r",
                    "windowsVirtualKeyCode": 13,
                    "nativeVirtualKeyCode": 13,
                }),
            )
            .await?;
        let _ = self
            .send_cdp(
                "Input.dispatchKeyEvent",
                json!({
                    "type": "keyUp",
                    "key": "Enter",
                    "code": "Enter",
                    "windowsVirtualKeyCode": 13,
                    "nativeVirtualKeyCode": 13,
                }),
            )
            .await?;
        Ok(())
    }

    /// Dispatch a real mouse click at viewport coordinates.
    pub async fn mouse_click(&self, x: f64, y: f64) -> Result<(), BrowserError> {
        let _ = self
            .send_cdp(
                "Input.dispatchMouseEvent",
                json!({ "type": "mouseMoved", "x": x, "y": y }),
            )
            .await?;
        for kind in ["mousePressed", "mouseReleased"] {
            let _ = self
                .send_cdp(
                    "Input.dispatchMouseEvent",
                    json!({
                        "type": kind,
                        "x": x,
                        "y": y,
                        "button": "left",
                        "clickCount": 1,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    // ─── Observation ─────────────────────────────────────────────────────

    /// Whether the first match is rendered with a non-empty box.
    pub async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let val = self.evaluate(&script::is_visible(selector)).await?;
        Ok(val.as_bool().unwrap_or(false))
    }

    /// Poll until `selector` is visible.
    pub async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible(selector).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    timeout_ms: millis(timeout),
                    context: format!("waiting for {selector}"),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// `name` of the first element matching `selector`; `None` if unset.
    pub async fn get_attribute(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.ensure_element_exists(selector).await?;
        let val = self.evaluate(&script::attribute(selector, attribute)).await?;
        Ok(val.as_str().map(String::from))
    }

    /// Attribute values across all matches. `href` is resolved to an absolute URL.
    pub async fn get_attribute_all(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let js = if attribute == "href" {
            script::hrefs(selector)
        } else {
            script::attribute_all(selector, attribute)
        };
        Ok(string_array(&self.evaluate(&js).await?))
    }

    /// `innerText` of all matches.
    pub async fn text_blocks(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        Ok(string_array(
            &self.evaluate(&script::text_blocks(selector)).await?,
        ))
    }

    /// Remove every element matching any selector.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn remove_elements(&self, selectors: &[String]) -> Result<usize, BrowserError> {
        if selectors.is_empty() {
            return Ok(0);
        }
        let val = self.evaluate(&script::remove_all(selectors)).await?;
        Ok(val.as_u64().unwrap_or(0) as usize)
    }

    /// Viewport box of the first match: `(x, y, width, height)`.
    pub async fn bounding_box(
        &self,
        selector: &str,
    ) -> Result<Option<(f64, f64, f64, f64)>, BrowserError> {
        let val = self.evaluate(&script::bounding_box(selector)).await?;
        if val.is_null() {
            return Ok(None);
        }
        Ok(Some((
            val["x"].as_f64().unwrap_or(0.0),
            val["y"].as_f64().unwrap_or(0.0),
            val["width"].as_f64().unwrap_or(0.0),
            val["height"].as_f64().unwrap_or(0.0),
        )))
    }

    /// Take a PNG screenshot and write it to `path`, creating parent directories.
    pub async fn screenshot_to(&self, path: &Path) -> Result<(), BrowserError> {
        let result = self
            .send_cdp("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let b64 = result["data"]
            .as_str()
            .ok_or_else(|| BrowserError::ActionFailed {
                action: "screenshot".into(),
                reason: "no data in response".into(),
            })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| BrowserError::ActionFailed {
                action: "screenshot".into(),
                reason: format!("base64 decode: {e}"),
            })?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrowserError::ActionFailed {
                    action: "screenshot".into(),
                    reason: e.to_string(),
                })?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| BrowserError::ActionFailed {
                action: "screenshot".into(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    // ─── Targets (windows) ───────────────────────────────────────────────

    /// Page targets currently open in the browser.
    pub(crate) async fn page_targets(&self) -> Result<Vec<TargetInfo>, BrowserError> {
        let targets = list_targets(&self.http, self.port)
            .await
            .map_err(BrowserError::Cdp)?;
        let pages: Vec<TargetInfo> = targets.into_iter().filter(|t| t.kind == "page").collect();
        for page in &pages {
            tracing::trace!(target_id = %page.id, url = %page.url, "page target");
        }
        Ok(pages)
    }

    /// Close a target by id.
    pub(crate) async fn close_target(&self, id: &str) -> Result<(), BrowserError> {
        self.devtools_get(&format!("close/{id}")).await
    }

    /// Activate (focus) a target by id.
    pub(crate) async fn activate_target(&self, id: &str) -> Result<(), BrowserError> {
        if id == self.canonical.0 {
            let _ = self.send_cdp("Page.bringToFront", json!({})).await?;
            return Ok(());
        }
        self.devtools_get(&format!("activate/{id}")).await
    }

    async fn devtools_get(&self, path: &str) -> Result<(), BrowserError> {
        let url = format!("http://127.0.0.1:{}/json/{path}", self.port);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BrowserError::Cdp(format!("{path}: {e}")))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BrowserError::WindowNotFound {
                window: path.rsplit('/').next().unwrap_or(path).to_string(),
            });
        }
        if !status.is_success() {
            return Err(BrowserError::Cdp(format!("{path}: HTTP {status}")));
        }
        Ok(())
    }

    /// Kill Chrome. The temporary profile goes with `self`.
    pub async fn close(self) -> Result<(), BrowserError> {
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            let _ = child.kill().await;
        }
        tracing::debug!("browser closed");
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    pub(crate) async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .send_cdp(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(exception) = result.get("exceptionDetails") {
            let msg = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("evaluation error");
            return Err(BrowserError::ActionFailed {
                action: "evaluate".into(),
                reason: msg.into(),
            });
        }
        Ok(result["result"]["value"].clone())
    }

    async fn ensure_element_exists(&self, selector: &str) -> Result<(), BrowserError> {
        let val = self.evaluate(&script::exists(selector)).await?;
        if val.as_bool() != Some(true) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.into(),
            });
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

fn string_array(val: &Value) -> Vec<String> {
    val.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

async fn list_targets(http: &reqwest::Client, port: u16) -> Result<Vec<TargetInfo>, String> {
    let url = format!("http://127.0.0.1:{port}/json/list");
    let resp = http.get(&url).send().await.map_err(|e| e.to_string())?;
    resp.json::<Vec<TargetInfo>>()
        .await
        .map_err(|e| e.to_string())
}

/// Pick the first page target that exposes a WebSocket URL.
pub(crate) fn first_page_target(targets: &[TargetInfo]) -> Option<(String, String)> {
    targets
        .iter()
        .filter(|t| t.kind == "page")
        .find_map(|t| {
            t.web_socket_debugger_url
                .as_ref()
                .map(|ws| (t.id.clone(), ws.clone()))
        })
}

/// Wait for Chrome to expose its page target, returning `(target_id, ws_url)`.
async fn wait_for_page_target(
    http: &reqwest::Client,
    port: u16,
    child: &mut Child,
) -> Result<(String, String), BrowserError> {
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;

        if let Some(status) = child.try_wait().map_err(|e| BrowserError::LaunchFailed {
            context: format!("wait: {e}"),
        })? {
            return Err(BrowserError::LaunchFailed {
                context: format!("Chrome exited early with {status}"),
            });
        }

        let Ok(targets) = list_targets(http, port).await else {
            continue;
        };
        if let Some(found) = first_page_target(&targets) {
            return Ok(found);
        }
    }

    Err(BrowserError::LaunchFailed {
        context: format!("Chrome did not start within 5 seconds on port {port}"),
    })
}

/// Owns the socket: writes queued commands, matches replies to them by id.
/// Events carry no id and are ignored.
async fn cdp_handler_loop(ws: WsStream, mut cmd_rx: mpsc::Receiver<CdpCommand>) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let next_id = AtomicU64::new(1);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let msg = json!({
                    "id": id,
                    "method": cmd.method,
                    "params": cmd.params,
                });
                let _ = pending.insert(id, cmd.response_tx);
                if ws_tx.send(Message::Text(msg.to_string().into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                let Some(Ok(msg)) = msg else { break };
                let Message::Text(text) = msg else { continue };
                let Ok(val): Result<Value, _> = serde_json::from_str(&text) else {
                    continue;
                };
                if let Some(id) = val.get("id").and_then(Value::as_u64) {
                    if let Some(tx) = pending.remove(&id) {
                        if let Some(err) = val.get("error") {
                            let msg = err["message"].as_str().unwrap_or("CDP error");
                            let _ = tx.send(Err(msg.into()));
                        } else {
                            let _ = tx.send(Ok(val["result"].clone()));
                        }
                    }
                }
            }
        }
    }
    tracing::debug!(pending = pending.len(), "CDP handler loop exited");
}


#[cfg(test)]
#[cfg(feature = "browser-integration")]
mod integration_tests {
    use super::*;

    async fn launch_test_session() -> BrowserSession {
        let chrome = crate::chrome::find_chrome(None).expect("Chrome required for integration tests");
        BrowserSession::launch(&LaunchOptions {
            chrome_path: chrome,
            headless: true,
            window_size: "1280,800".into(),
            user_agent: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn navigate_updates_url() {
        let session = launch_test_session().await;
        session.navigate("data:text/html,<h1>Test</h1>").await.unwrap();
        assert!(session.current_url().is_some());
    }

    #[tokio::test]
    async fn visibility_of_hidden_element_is_false() {
        let session = launch_test_session().await;
        session
            .navigate(r#"data:text/html,<button id="a" style="display:none">x</button><button id="b">y</button>"#)
            .await
            .unwrap();
        assert!(!session.is_visible("#a").await.unwrap());
        assert!(session.is_visible("#b").await.unwrap());
        assert!(!session.is_visible("#missing").await.unwrap());
    }

    #[tokio::test]
    async fn screenshot_writes_png() {
        let session = launch_test_session().await;
        session.navigate("data:text/html,<h1>Hello</h1>").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shots").join("a.png");
        session.screenshot_to(&path).await.unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[tokio::test]
    async fn click_nonexistent_element_returns_error() {
        let session = launch_test_session().await;
        session.navigate("data:text/html,<p>nothing</p>").await.unwrap();
        assert!(session.click("#nonexistent").await.is_err());
    }
}
