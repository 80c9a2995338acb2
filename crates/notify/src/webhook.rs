//! HTTP webhook channel adapters.
//!
//! Each channel POSTs a JSON payload to its own endpoint. Client errors (4xx)
//! are permanent, server errors and transport failures are transient.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use upnext_core::{Channel, ChannelDeliveryError, UserId};

use crate::channel::{ChannelAdapters, DeliveryResult};

/// Endpoints for the webhook adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving `{to, subject, body}`
    pub email_url: Option<String>,
    /// Endpoint receiving `{to, message}`
    pub sms_url: Option<String>,
    /// Endpoint receiving `{user_id, title, body, data}`
    pub push_url: Option<String>,
    /// Optional bearer token sent with every request
    pub token: Option<String>,
}

/// Adapters that deliver through HTTP webhooks.
pub struct WebhookAdapters {
    client: Client,
    config: WebhookConfig,
}

impl WebhookAdapters {
    /// Create adapters; `timeout` bounds each request.
    pub fn new(config: WebhookConfig, timeout: Duration) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    async fn post(
        &self,
        channel: Channel,
        url: Option<&String>,
        payload: serde_json::Value,
    ) -> DeliveryResult {
        let url = url.ok_or_else(|| {
            ChannelDeliveryError::permanent(format!("no {channel} endpoint configured"))
        })?;

        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ChannelDeliveryError::timeout(e.to_string())
            } else {
                ChannelDeliveryError::transient(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(%channel, %status, "webhook answered");
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify(status, text))
    }
}

fn classify(status: StatusCode, text: String) -> ChannelDeliveryError {
    let message = format!("webhook returned {status}: {text}");
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        ChannelDeliveryError::transient(message)
    } else if status.is_client_error() {
        ChannelDeliveryError::permanent(message)
    } else {
        ChannelDeliveryError::transient(message)
    }
}

#[async_trait]
impl ChannelAdapters for WebhookAdapters {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> DeliveryResult {
        self.post(
            Channel::Email,
            self.config.email_url.as_ref(),
            serde_json::json!({ "to": to, "subject": subject, "body": body }),
        )
        .await
    }

    async fn send_sms(&self, to: &str, message: &str) -> DeliveryResult {
        self.post(
            Channel::Sms,
            self.config.sms_url.as_ref(),
            serde_json::json!({ "to": to, "message": message }),
        )
        .await
    }

    async fn send_push(
        &self,
        user_id: &UserId,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> DeliveryResult {
        self.post(
            Channel::Push,
            self.config.push_url.as_ref(),
            serde_json::json!({ "user_id": user_id, "title": title, "body": body, "data": data }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::DeliveryFailureKind;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, String::new()).kind,
            DeliveryFailureKind::Permanent
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, String::new()).kind,
            DeliveryFailureKind::Transient
        );
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, String::new()).kind,
            DeliveryFailureKind::Transient
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_permanent() {
        let adapters = WebhookAdapters::new(WebhookConfig::default(), Duration::from_secs(1));
        let err = adapters.send_sms("+15550100", "hi").await.unwrap_err();
        assert_eq!(err.kind, DeliveryFailureKind::Permanent);
    }
}
