use std::time::Duration;

use async_trait::async_trait;

use super::{Notification, Notifier};
use crate::error::{Error, Result};

/// Posts notifications as JSON to the push gateway.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(Error::notify)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::notify(format!(
                "push gateway answered {status}: {body}"
            )));
        }
        tracing::debug!(
            recipient = %notification.recipient_profile_id,
            alarm_type = ?notification.alarm_type,
            "notification delivered"
        );
        Ok(())
    }
}
