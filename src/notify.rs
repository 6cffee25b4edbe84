//! Guardian alert dispatch.
//!
//! The alert itself (email, push, ...) is sent by an external function; this
//! side only posts `{ userMessage, timestamp }` and reads back
//! `{ "success": true }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::DistressEvent;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no notification endpoint configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("endpoint did not confirm delivery")]
    Rejected,
}

/// Request body of the alert endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianAlert {
    pub user_message: String,
    pub timestamp: String,
}

impl From<&DistressEvent> for GuardianAlert {
    fn from(event: &DistressEvent) -> Self {
        Self {
            user_message: event.raw_text.clone(),
            timestamp: event.timestamp.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlertAck {
    #[serde(default)]
    success: bool,
}

/// When to contact the guardian after a crisis message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    /// Send straight away.
    #[default]
    Automatic,
    /// Hold the alert until the user agrees.
    AskFirst,
    Off,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &GuardianAlert) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn notify(&self, alert: &GuardianAlert) -> Result<(), NotifyError> {
        (**self).notify(alert).await
    }
}

/// Stand-in used when no endpoint is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl Notifier for Unconfigured {
    async fn notify(&self, _alert: &GuardianAlert) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Posts alerts to an HTTP function endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Hosted functions expect the project key both as a bearer token and
    /// as an `apikey` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, alert: &GuardianAlert) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.endpoint).json(alert);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: AlertAck = response.json().await?;
        if !ack.success {
            return Err(NotifyError::Rejected);
        }
        tracing::info!(endpoint = %self.endpoint, "guardian alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    type Seen = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    /// Serve a single route that records requests and answers with a fixed
    /// status and body. Returns the endpoint URL.
    async fn serve(status: StatusCode, reply: Value, seen: Seen) -> String {
        let app = Router::new()
            .route(
                "/functions/v1/send-guardian-email",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            seen.lock().unwrap().push((headers, body));
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/functions/v1/send-guardian-email")
    }

    fn alert() -> GuardianAlert {
        GuardianAlert {
            user_message: "I feel hopeless".into(),
            timestamp: "3/9/2024, 2:05:07 PM".into(),
        }
    }

    #[tokio::test]
    async fn posts_wire_contract_body() {
        let seen = Seen::default();
        let url = serve(StatusCode::OK, json!({ "success": true }), seen.clone()).await;
        let notifier = HttpNotifier::new(url, Duration::from_secs(5))
            .unwrap()
            .with_api_key("anon-key");

        notifier.notify(&alert()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (headers, body) = &seen[0];
        assert_eq!(
            body,
            &json!({ "userMessage": "I feel hopeless", "timestamp": "3/9/2024, 2:05:07 PM" })
        );
        assert_eq!(headers["authorization"], "Bearer anon-key");
        assert_eq!(headers["apikey"], "anon-key");
    }

    #[tokio::test]
    async fn extra_ack_fields_are_ignored() {
        let reply = json!({ "success": true, "emailResponse": { "id": "abc" } });
        let url = serve(StatusCode::OK, reply, Seen::default()).await;
        let notifier = HttpNotifier::new(url, Duration::from_secs(5)).unwrap();

        assert!(notifier.notify(&alert()).await.is_ok());
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let reply = json!({ "error": "mail provider down" });
        let url = serve(StatusCode::INTERNAL_SERVER_ERROR, reply, Seen::default()).await;
        let notifier = HttpNotifier::new(url, Duration::from_secs(5)).unwrap();

        match notifier.notify(&alert()).await {
            Err(NotifyError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("mail provider down"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfirmed_delivery_is_rejected() {
        let url = serve(StatusCode::OK, json!({ "success": false }), Seen::default()).await;
        let notifier = HttpNotifier::new(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotifyError::Rejected)
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier =
            HttpNotifier::new(format!("http://{addr}/alert"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotifyError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_always_fails() {
        assert!(matches!(
            Unconfigured.notify(&alert()).await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[test]
    fn alert_from_event() {
        let event = DistressEvent {
            raw_text: "no point anymore".into(),
            matched_keyword: "no point".into(),
            timestamp: "1/1/2024, 9:00:00 AM".into(),
        };
        let alert = GuardianAlert::from(&event);
        assert_eq!(alert.user_message, "no point anymore");
        assert_eq!(alert.timestamp, "1/1/2024, 9:00:00 AM");
    }

    #[test]
    fn policy_names() {
        let policy: NotificationPolicy = serde_json::from_str("\"ask_first\"").unwrap();
        assert_eq!(policy, NotificationPolicy::AskFirst);
        assert_eq!(NotificationPolicy::default(), NotificationPolicy::Automatic);
    }
}
