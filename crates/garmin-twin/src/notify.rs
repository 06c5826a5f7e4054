//! Push delivery of the generated message (Telegram Bot API)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::error::{Result, TwinError};

/// What the push endpoint did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// The endpoint answered with a non-success status
    Rejected { status: u16, body: String },
}

/// Chat push capability
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Transport failures are `Err`; an answered-but-refused send is `Ok(Rejected)`
    async fn send(&self, channel_id: &str, text: &str) -> Result<DeliveryStatus>;
}

/// Append the dashboard link to the generated text
pub fn compose_message(text: &str, dashboard_url: &str) -> String {
    format!("{}\n\n📡 Dashboard:\n{}", text.trim_end(), dashboard_url)
}

/// Telegram `sendMessage` client
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build().map_err(TwinError::Http)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl PushChannel for TelegramNotifier {
    async fn send(&self, channel_id: &str, text: &str) -> Result<DeliveryStatus> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        debug!("POST {}/bot***/sendMessage", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": channel_id, "text": text }))
            .send()
            .await
            .map_err(|e| TwinError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(DeliveryStatus::Delivered)
        } else {
            Ok(DeliveryStatus::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_compose_message() {
        let msg = compose_message("Go run 10k 🏃\n", "https://twin.example/");
        assert_eq!(msg, "Go run 10k 🏃\n\n📡 Dashboard:\nhttps://twin.example/");
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:ABC/sendMessage"))
            .and(body_json(json!({"chat_id": "42", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&server.uri(), "123:ABC").unwrap();
        let status = notifier.send("42", "hello").await.unwrap();
        assert_eq!(status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn test_rejected_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"ok":false,"description":"Bad Request: chat not found"}"#),
            )
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&server.uri(), "123:ABC").unwrap();
        match notifier.send("0", "hello").await.unwrap() {
            DeliveryStatus::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("chat not found"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_delivery_error() {
        let notifier = TelegramNotifier::new("http://127.0.0.1:9", "123:ABC").unwrap();
        let err = notifier.send("42", "hello").await.unwrap_err();
        assert!(matches!(err, TwinError::Delivery(_)));
        assert!(!err.to_string().contains("123:ABC"));
    }
}
