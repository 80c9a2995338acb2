//! Channel adapters.
//!
//! Each outbound channel is a fallible call with a uniform shape. The
//! scheduler never talks to a transport directly.

use async_trait::async_trait;
use tracing::info;
use upnext_core::{Channel, ChannelDeliveryError, Notification, UserId, UserProfile};

/// Result of one adapter call.
pub type DeliveryResult = std::result::Result<(), ChannelDeliveryError>;

/// Outbound email, SMS and push transports.
#[async_trait]
pub trait ChannelAdapters: Send + Sync {
    /// Send an email.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> DeliveryResult;

    /// Send a text message.
    async fn send_sms(&self, to: &str, message: &str) -> DeliveryResult;

    /// Send a push notification to the learner's devices.
    async fn send_push(
        &self,
        user_id: &UserId,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> DeliveryResult;
}

/// Render `notification` for `channel` and hand it to the matching adapter.
pub async fn dispatch(
    adapters: &dyn ChannelAdapters,
    channel: Channel,
    user: &UserProfile,
    notification: &Notification,
) -> DeliveryResult {
    match channel {
        Channel::Email => {
            let to = user
                .email
                .as_deref()
                .ok_or_else(|| ChannelDeliveryError::permanent("no email address on file"))?;
            adapters
                .send_email(to, &notification.title, &email_body(notification))
                .await
        }
        Channel::Sms => {
            let to = user
                .phone
                .as_deref()
                .ok_or_else(|| ChannelDeliveryError::permanent("no phone number on file"))?;
            adapters
                .send_sms(to, &format!("{}: {}", notification.title, notification.message))
                .await
        }
        Channel::Push => {
            adapters
                .send_push(
                    &user.user_id,
                    &notification.title,
                    &notification.message,
                    &push_data(notification),
                )
                .await
        }
    }
}

fn email_body(notification: &Notification) -> String {
    let mut body = notification.message.clone();
    if let Some(action) = &notification.action {
        if let Some(url) = &action.url {
            body.push_str(&format!("\n\n{}: {}", action.text, url));
        }
    }
    body.push_str("\n\n--\nUpNext - Your AI Career Navigator");
    body
}

fn push_data(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "notification_id": notification.id,
        "type": notification.notification_type,
        "resource": notification.linked_resource,
    })
}

/// Adapters that only log what they would send.
///
/// Used in development and whenever no transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAdapters;

#[async_trait]
impl ChannelAdapters for LoggingAdapters {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> DeliveryResult {
        info!(to, subject, "email (log only)");
        Ok(())
    }

    async fn send_sms(&self, to: &str, message: &str) -> DeliveryResult {
        info!(to, message, "sms (log only)");
        Ok(())
    }

    async fn send_push(
        &self,
        user_id: &UserId,
        title: &str,
        _body: &str,
        _data: &serde_json::Value,
    ) -> DeliveryResult {
        info!(user_id = %user_id, title, "push (log only)");
        Ok(())
    }
}
