//! Code Channel: poll a mailbox until a one-time code arrives.

use std::sync::Arc;
use std::time::Duration;

use keeper_core::{Credentials, MailError, Mailbox, MessageId, OneTimeCode};
use keeper_settings::MailSettings;

use crate::body::{extract_code, message_text};

/// How long to keep polling for a code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollBudget {
    /// Maximum number of search rounds.
    pub rounds: u32,
    /// Sleep between rounds.
    pub interval: Duration,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            rounds: 25,
            interval: Duration::from_secs(12),
        }
    }
}

impl PollBudget {
    /// Budget configured in [`MailSettings`].
    pub fn from_settings(settings: &MailSettings) -> Self {
        Self {
            rounds: settings.poll_rounds,
            interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }
}

/// Retrieves one-time login codes from a [`Mailbox`].
pub struct CodeChannel {
    mailbox: Arc<dyn Mailbox>,
    sender: String,
}

impl CodeChannel {
    /// Channel reading codes sent by `sender`.
    pub fn new(mailbox: Arc<dyn Mailbox>, sender: impl Into<String>) -> Self {
        Self {
            mailbox,
            sender: sender.into(),
        }
    }

    /// Poll until a code arrives or `budget` is exhausted.
    ///
    /// Only the message the code came from is marked read. On timeout no
    /// message is touched.
    pub async fn fetch_code(
        &self,
        credentials: &Credentials,
        budget: PollBudget,
    ) -> Result<OneTimeCode, MailError> {
        tracing::info!(
            account = credentials.account(),
            sender = %self.sender,
            rounds = budget.rounds,
            "waiting for one-time code"
        );

        for round in 1..=budget.rounds {
            match self.poll_once().await {
                Ok(Some(code)) => {
                    tracing::info!(round, "one-time code received");
                    return Ok(code);
                }
                Ok(None) => tracing::debug!(round, "no code yet"),
                Err(e) => tracing::warn!(round, error = %e, "mailbox poll failed"),
            }
            if round < budget.rounds {
                tokio::time::sleep(budget.interval).await;
            }
        }

        tracing::warn!(rounds = budget.rounds, "no one-time code before budget ran out");
        Err(MailError::CodeTimeout {
            rounds: budget.rounds,
        })
    }

    /// One search round. Messages are examined newest first.
    async fn poll_once(&self) -> Result<Option<OneTimeCode>, MailError> {
        let mut ids = self.mailbox.search_unseen_from(&self.sender).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));

        for id in ids {
            let Some(code) = self.code_in(id).await? else {
                continue;
            };
            self.mailbox.mark_seen(id).await?;
            return Ok(Some(code));
        }
        Ok(None)
    }

    async fn code_in(&self, id: MessageId) -> Result<Option<OneTimeCode>, MailError> {
        let raw = self.mailbox.fetch_raw(id).await?;
        let text = message_text(&raw);
        let code = extract_code(&text).map(OneTimeCode::new);
        if code.is_none() {
            tracing::debug!(message = %id, "message carries no code");
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// In-memory mailbox. `arrivals` become visible after N searches.
    #[derive(Default)]
    struct FakeMailbox {
        messages: Mutex<BTreeMap<u32, (String, bool)>>,
        arrivals: Mutex<Vec<(usize, u32, String)>>,
        searches: Mutex<usize>,
        marked: Mutex<Vec<u32>>,
        fail_searches: Mutex<usize>,
    }

    impl FakeMailbox {
        fn with(messages: &[(u32, &str)]) -> Self {
            let fake = Self::default();
            for (id, body) in messages {
                let _ = fake
                    .messages
                    .lock()
                    .insert(*id, (plain(body), false));
            }
            fake
        }

        fn arriving_after(self, searches: usize, id: u32, body: &str) -> Self {
            self.arrivals.lock().push((searches, id, plain(body)));
            self
        }

        fn is_seen(&self, id: u32) -> bool {
            self.messages.lock().get(&id).is_some_and(|(_, seen)| *seen)
        }
    }

    fn plain(body: &str) -> String {
        format!("From: Pella <noreply@pella.app>\r\nContent-Type: text/plain\r\n\r\n{body}\r\n")
    }

    #[async_trait]
    impl Mailbox for FakeMailbox {
        async fn search_unseen_from(&self, _sender: &str) -> Result<Vec<MessageId>, MailError> {
            {
                let mut fails = self.fail_searches.lock();
                if *fails > 0 {
                    *fails -= 1;
                    return Err(MailError::Protocol {
                        command: "SEARCH".into(),
                        reason: "connection reset".into(),
                    });
                }
            }
            let count = {
                let mut searches = self.searches.lock();
                *searches += 1;
                *searches
            };
            let mut messages = self.messages.lock();
            for (after, id, body) in self.arrivals.lock().iter() {
                if count > *after {
                    let _ = messages.entry(*id).or_insert_with(|| (body.clone(), false));
                }
            }
            Ok(messages
                .iter()
                .filter(|(_, (_, seen))| !seen)
                .map(|(id, _)| MessageId(*id))
                .collect())
        }

        async fn fetch_raw(&self, id: MessageId) -> Result<Vec<u8>, MailError> {
            self.messages
                .lock()
                .get(&id.0)
                .map(|(body, _)| body.clone().into_bytes())
                .ok_or(MailError::Parse {
                    id: id.0,
                    reason: "missing".into(),
                })
        }

        async fn mark_seen(&self, id: MessageId) -> Result<(), MailError> {
            if let Some(entry) = self.messages.lock().get_mut(&id.0) {
                entry.1 = true;
            }
            self.marked.lock().push(id.0);
            Ok(())
        }
    }

    fn creds() -> Credentials {
        Credentials::new("owner@example.com", "app-password")
    }

    fn budget(rounds: u32) -> PollBudget {
        PollBudget {
            rounds,
            interval: Duration::from_secs(12),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_code_and_consumes_message() {
        let mailbox = Arc::new(FakeMailbox::with(&[(7, "Your code is 482913")]));
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let code = channel.fetch_code(&creds(), budget(3)).await.unwrap();
        assert_eq!(code.as_str(), "482913");
        assert!(mailbox.is_seen(7));

        let again = mailbox.search_unseen_from("Pella").await.unwrap();
        assert!(!again.contains(&MessageId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_nothing() {
        let mailbox = Arc::new(FakeMailbox::with(&[(3, "Welcome to Pella, no code here")]));
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let err = channel.fetch_code(&creds(), budget(4)).await.unwrap_err();
        assert_matches!(err, MailError::CodeTimeout { rounds: 4 });
        assert!(mailbox.marked.lock().is_empty());
        assert!(!mailbox.is_seen(3));
        assert_eq!(*mailbox.searches.lock(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn most_recent_message_wins() {
        let mailbox = Arc::new(FakeMailbox::with(&[
            (10, "Old code 111111"),
            (12, "New code 222222"),
            (11, "Middle code 333333"),
        ]));
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let code = channel.fetch_code(&creds(), budget(1)).await.unwrap();
        assert_eq!(code.as_str(), "222222");
        assert_eq!(*mailbox.marked.lock(), vec![12]);
        assert!(!mailbox.is_seen(10));
        assert!(!mailbox.is_seen(11));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_newer_message_without_code() {
        let mailbox = Arc::new(FakeMailbox::with(&[
            (1, "Code 135790"),
            (2, "Newsletter with no digits"),
        ]));
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let code = channel.fetch_code(&creds(), budget(1)).await.unwrap();
        assert_eq!(code.as_str(), "135790");
        assert_eq!(*mailbox.marked.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_late_arrival() {
        let mailbox =
            Arc::new(FakeMailbox::default().arriving_after(2, 5, "Login code 908172"));
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let start = tokio::time::Instant::now();
        let code = channel.fetch_code(&creds(), budget(5)).await.unwrap();
        assert_eq!(code.as_str(), "908172");
        assert_eq!(*mailbox.searches.lock(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(24));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_counts_as_empty_round() {
        let mailbox = Arc::new(FakeMailbox::with(&[(9, "code 424242")]));
        *mailbox.fail_searches.lock() = 1;
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let code = channel.fetch_code(&creds(), budget(2)).await.unwrap();
        assert_eq!(code.as_str(), "424242");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_still_exhaust_budget() {
        let mailbox = Arc::new(FakeMailbox::with(&[(9, "code 424242")]));
        *mailbox.fail_searches.lock() = 3;
        let channel = CodeChannel::new(mailbox.clone(), "Pella");

        let err = channel.fetch_code(&creds(), budget(3)).await.unwrap_err();
        assert_matches!(err, MailError::CodeTimeout { rounds: 3 });
        assert!(!mailbox.is_seen(9));
    }

    #[test]
    fn budget_from_settings() {
        let b = PollBudget::from_settings(&MailSettings::default());
        assert_eq!(b, PollBudget::default());
    }
}
