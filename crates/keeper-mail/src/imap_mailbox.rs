//! IMAP-over-TLS [`Mailbox`] adapter.
//!
//! The `imap` crate is synchronous, so every command runs on
//! [`tokio::task::spawn_blocking`] against a lazily opened, shared session.
//! A failed command drops the session; the next call reconnects.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use native_tls::{TlsConnector, TlsStream};
use parking_lot::Mutex;

use keeper_core::{Credentials, MailError, Mailbox, MessageId};
use keeper_settings::MailSettings;

type ImapSession = imap::Session<TlsStream<TcpStream>>;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(20);

/// Where and how to reach the mailbox.
#[derive(Clone, Debug)]
pub struct ImapConfig {
    /// Server host, also used for TLS name verification.
    pub host: String,
    /// TLS port.
    pub port: u16,
    /// Folder to select.
    pub folder: String,
}

impl From<&MailSettings> for ImapConfig {
    fn from(settings: &MailSettings) -> Self {
        Self {
            host: settings.imap_host.clone(),
            port: settings.imap_port,
            folder: settings.folder.clone(),
        }
    }
}

/// Mailbox backed by an IMAP server.
pub struct ImapMailbox {
    inner: Arc<Inner>,
}

struct Inner {
    config: ImapConfig,
    credentials: Credentials,
    session: Mutex<Option<ImapSession>>,
}

impl ImapMailbox {
    /// Create an adapter. No connection is made until the first command.
    pub fn new(config: ImapConfig, credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                credentials,
                session: Mutex::new(None),
            }),
        }
    }

    /// Log out of the server if a session is open.
    pub async fn logout(&self) {
        let inner = Arc::clone(&self.inner);
        let _ = tokio::task::spawn_blocking(move || {
            if let Some(mut session) = inner.session.lock().take() {
                if let Err(e) = session.logout() {
                    tracing::debug!(error = %e, "imap logout failed");
                }
            }
        })
        .await;
    }

    async fn with_session<T, F>(&self, command: &'static str, op: F) -> Result<T, MailError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> Result<T, imap::Error> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.session.lock();
            if guard.is_none() {
                *guard = Some(inner.open()?);
            }
            let Some(session) = guard.as_mut() else {
                return Err(MailError::Protocol {
                    command: command.into(),
                    reason: "no session".into(),
                });
            };
            op(session).map_err(|e| {
                // Connection state is unknown after a failed command.
                *guard = None;
                MailError::Protocol {
                    command: command.into(),
                    reason: e.to_string(),
                }
            })
        })
        .await
        .map_err(|e| MailError::Protocol {
            command: command.into(),
            reason: format!("worker panicked: {e}"),
        })?
    }
}

impl Inner {
    fn open(&self) -> Result<ImapSession, MailError> {
        let ImapConfig { host, port, folder } = &self.config;
        let connect_err = |reason: String| MailError::Connect {
            host: host.clone(),
            port: *port,
            reason,
        };

        let tcp =
            TcpStream::connect((host.as_str(), *port)).map_err(|e| connect_err(e.to_string()))?;
        let _ = tcp.set_read_timeout(Some(SOCKET_TIMEOUT));
        let _ = tcp.set_write_timeout(Some(SOCKET_TIMEOUT));
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(format!("tls builder: {e}")))?;
        let stream = tls
            .connect(host, tcp)
            .map_err(|e| connect_err(format!("tls handshake: {e}")))?;
        let mut client = imap::Client::new(stream);
        let _ = client
            .read_greeting()
            .map_err(|e| connect_err(format!("greeting: {e}")))?;

        let mut session = client
            .login(self.credentials.account(), self.credentials.mailbox_secret())
            .map_err(|(e, _)| MailError::Auth {
                account: self.credentials.account().to_string(),
                reason: e.to_string(),
            })?;
        let _ = session.select(folder).map_err(|e| MailError::Protocol {
            command: "SELECT".into(),
            reason: e.to_string(),
        })?;

        tracing::info!(host = %host, port, folder = %folder, "imap session opened");
        Ok(session)
    }
}

/// `UNSEEN FROM "<sender>"` with the sender quoted for IMAP.
pub(crate) fn unseen_from_query(sender: &str) -> String {
    let escaped = sender.replace('\\', "\\\\").replace('"', "\\\"");
    format!("UNSEEN FROM \"{escaped}\"")
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn search_unseen_from(&self, sender: &str) -> Result<Vec<MessageId>, MailError> {
        let query = unseen_from_query(sender);
        let ids = self
            .with_session("SEARCH", move |session| {
                // Pick up messages delivered since the last round.
                session.noop()?;
                session.uid_search(&query)
            })
            .await?;
        let mut ids: Vec<MessageId> = ids.into_iter().map(MessageId).collect();
        ids.sort_unstable();
        tracing::debug!(count = ids.len(), "unseen messages from sender");
        Ok(ids)
    }

    async fn fetch_raw(&self, id: MessageId) -> Result<Vec<u8>, MailError> {
        let body = self
            .with_session("FETCH", move |session| {
                let fetches = session.uid_fetch(id.0.to_string(), "BODY.PEEK[]")?;
                Ok(fetches.iter().find_map(|f| f.body().map(<[u8]>::to_vec)))
            })
            .await?;
        body.ok_or(MailError::Parse {
            id: id.0,
            reason: "server returned no body".into(),
        })
    }

    async fn mark_seen(&self, id: MessageId) -> Result<(), MailError> {
        self.with_session("STORE", move |session| {
            let _ = session.uid_store(id.0.to_string(), "+FLAGS (\\Seen)")?;
            Ok(())
        })
        .await?;
        tracing::debug!(message = %id, "message marked seen");
        Ok(())
    }
}
