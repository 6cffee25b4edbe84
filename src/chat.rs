//! Companion chat session.
//!
//! Each message goes `Received -> Classified -> [alert dispatched] ->
//! ResponseReady`. Crisis messages always get the supportive reply; the
//! guardian alert is attempted at most once per message and its outcome is
//! only reported alongside the reply.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distress::DistressClassifier;
use crate::models::{ChatMessage, DistressEvent};
use crate::notify::{GuardianAlert, NotificationPolicy, Notifier};
use crate::responses::{self, Region, Topic};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no guardian alert is waiting for consent")]
    NoPendingAlert,
}

/// What happened to the guardian alert for a crisis message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertOutcome {
    Notified,
    NotificationFailed,
    AwaitingConsent,
    Declined,
    Disabled,
}

impl AlertOutcome {
    /// Secondary notice shown next to the reply, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            AlertOutcome::Notified => {
                Some("Your guardian has been notified 💕 Someone who cares about you will reach out soon.")
            }
            AlertOutcome::AwaitingConsent => {
                Some("Would you like me to let your guardian know, so someone can check in on you?")
            }
            AlertOutcome::NotificationFailed | AlertOutcome::Declined | AlertOutcome::Disabled => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    /// Topic bucket the reply came from; `None` for crisis replies.
    pub topic: Option<Topic>,
    pub distress: Option<DistressEvent>,
    pub alert: Option<AlertOutcome>,
}

impl ChatReply {
    pub fn is_crisis(&self) -> bool {
        self.distress.is_some()
    }
}

pub struct ChatSession<N, R> {
    classifier: DistressClassifier,
    notifier: N,
    rng: R,
    policy: NotificationPolicy,
    region: Region,
    transcript: Vec<ChatMessage>,
    pending: Option<DistressEvent>,
}

impl<N: Notifier, R: Rng> ChatSession<N, R> {
    pub fn new(classifier: DistressClassifier, notifier: N, rng: R) -> Self {
        Self {
            classifier,
            notifier,
            rng,
            policy: NotificationPolicy::default(),
            region: Region::default(),
            transcript: vec![ChatMessage::bot(responses::WELCOME, false)],
            pending: None,
        }
    }

    pub fn with_policy(mut self, policy: NotificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn pending_alert(&self) -> Option<&DistressEvent> {
        self.pending.as_ref()
    }

    pub async fn handle_message(&mut self, text: &str) -> Result<ChatReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.transcript.push(ChatMessage::user(text));

        let now = chrono::Local::now();
        let reply = match self.classifier.detect(text, &now) {
            Some(event) => {
                tracing::warn!(keyword = %event.matched_keyword, "distress message detected");
                let alert = match self.policy {
                    NotificationPolicy::Automatic => self.dispatch(&event).await,
                    NotificationPolicy::AskFirst => {
                        if self.pending.replace(event.clone()).is_some() {
                            tracing::debug!("replacing earlier alert awaiting consent");
                        }
                        AlertOutcome::AwaitingConsent
                    }
                    NotificationPolicy::Off => AlertOutcome::Disabled,
                };
                ChatReply {
                    text: responses::crisis_response(self.region),
                    topic: None,
                    distress: Some(event),
                    alert: Some(alert),
                }
            }
            None => {
                let topic = Topic::for_message(text);
                ChatReply {
                    text: topic.pick(&mut self.rng).to_string(),
                    topic: Some(topic),
                    distress: None,
                    alert: None,
                }
            }
        };

        self.transcript
            .push(ChatMessage::bot(reply.text.clone(), reply.is_crisis()));
        Ok(reply)
    }

    /// Send the alert held back under [`NotificationPolicy::AskFirst`].
    pub async fn confirm_alert(&mut self) -> Result<AlertOutcome, ChatError> {
        let event = self.pending.take().ok_or(ChatError::NoPendingAlert)?;
        Ok(self.dispatch(&event).await)
    }

    pub fn decline_alert(&mut self) -> Result<AlertOutcome, ChatError> {
        self.pending.take().ok_or(ChatError::NoPendingAlert)?;
        tracing::info!("guardian alert declined");
        Ok(AlertOutcome::Declined)
    }

    async fn dispatch(&self, event: &DistressEvent) -> AlertOutcome {
        match self.notifier.notify(&GuardianAlert::from(event)).await {
            Ok(()) => AlertOutcome::Notified,
            Err(e) => {
                tracing::error!(error = %e, "failed to send guardian alert");
                AlertOutcome::NotificationFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::models::Author;
    use crate::notify::NotifyError;

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<GuardianAlert>>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, alert: &GuardianAlert) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push(alert.clone());
            if self.fail {
                Err(NotifyError::Rejected)
            } else {
                Ok(())
            }
        }
    }

    fn session(notifier: Recorder) -> ChatSession<Recorder, StdRng> {
        ChatSession::new(
            DistressClassifier::default(),
            notifier,
            StdRng::seed_from_u64(1),
        )
    }

    #[tokio::test]
    async fn crisis_message_notifies_once() {
        let notifier = Recorder::default();
        let mut chat = session(notifier.clone());

        let reply = chat.handle_message("I want to kill myself today").await.unwrap();

        assert!(reply.is_crisis());
        assert_eq!(reply.text, responses::crisis_response(Region::India));
        assert_eq!(reply.alert, Some(AlertOutcome::Notified));
        assert_eq!(notifier.calls(), 1);
        let sent = &notifier.calls.lock().unwrap()[0];
        assert_eq!(sent.user_message, "I want to kill myself today");
        assert!(!sent.timestamp.is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_supportive_reply() {
        let notifier = Recorder::failing();
        let mut chat = session(notifier.clone());

        let reply = chat.handle_message("everything is hopeless").await.unwrap();

        assert_eq!(reply.text, responses::crisis_response(Region::India));
        assert_eq!(reply.alert, Some(AlertOutcome::NotificationFailed));
        assert_eq!(reply.alert.and_then(|a| a.notice()), None);
        assert_eq!(notifier.calls(), 1);
    }

    #[tokio::test]
    async fn ask_first_waits_for_consent() {
        let notifier = Recorder::default();
        let mut chat = session(notifier.clone()).with_policy(NotificationPolicy::AskFirst);

        let reply = chat.handle_message("I feel worthless").await.unwrap();
        assert_eq!(reply.alert, Some(AlertOutcome::AwaitingConsent));
        assert_eq!(notifier.calls(), 0);
        assert!(chat.pending_alert().is_some());

        assert_eq!(chat.confirm_alert().await.unwrap(), AlertOutcome::Notified);
        assert_eq!(notifier.calls(), 1);

        // Already sent; a second confirmation has nothing to send.
        assert!(matches!(
            chat.confirm_alert().await,
            Err(ChatError::NoPendingAlert)
        ));
        assert_eq!(notifier.calls(), 1);
    }

    #[tokio::test]
    async fn ask_first_decline_sends_nothing() {
        let notifier = Recorder::default();
        let mut chat = session(notifier.clone()).with_policy(NotificationPolicy::AskFirst);

        chat.handle_message("I want to give up").await.unwrap();
        assert_eq!(chat.decline_alert().unwrap(), AlertOutcome::Declined);
        assert!(chat.pending_alert().is_none());
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn policy_off_never_dispatches() {
        let notifier = Recorder::default();
        let mut chat = session(notifier.clone()).with_policy(NotificationPolicy::Off);

        let reply = chat.handle_message("thinking about suicide").await.unwrap();
        assert_eq!(reply.alert, Some(AlertOutcome::Disabled));
        assert!(reply.text.contains("helplines"));
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn ordinary_replies_come_from_topic_bucket() {
        let notifier = Recorder::default();
        let mut chat = session(notifier.clone());

        for _ in 0..5 {
            let reply = chat.handle_message("my cramps are bad").await.unwrap();
            assert_eq!(reply.topic, Some(Topic::Cramps));
            assert!(Topic::Cramps.responses().contains(&reply.text.as_str()));
            assert!(reply.alert.is_none());
        }
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn seeded_sessions_reply_identically() {
        let mut a = session(Recorder::default());
        let mut b = session(Recorder::default());

        for msg in ["hello", "feeling sad", "what now?"] {
            let ra = a.handle_message(msg).await.unwrap();
            let rb = b.handle_message(msg).await.unwrap();
            assert_eq!(ra.text, rb.text);
        }
    }

    #[tokio::test]
    async fn transcript_records_both_sides() {
        let mut chat = session(Recorder::default());
        assert_eq!(chat.transcript().len(), 1);

        chat.handle_message("hello").await.unwrap();
        chat.handle_message("no point in anything").await.unwrap();

        let t = chat.transcript();
        assert_eq!(t.len(), 5);
        assert_eq!(t[1].author, Author::User);
        assert_eq!(t[2].author, Author::Bot);
        assert!(!t[2].is_alert);
        assert_eq!(t[3].text, "no point in anything");
        assert!(t[4].is_alert);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let mut chat = session(Recorder::default());
        assert!(matches!(
            chat.handle_message("   ").await,
            Err(ChatError::EmptyMessage)
        ));
        assert_eq!(chat.transcript().len(), 1);
    }
}
