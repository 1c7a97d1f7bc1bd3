use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use custodia_core::EmailMessage;

use super::{Mailer, SendOutcome};
use crate::config::MailerConfig;
use crate::error::NotificationError;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid JSON API transport.
pub struct SendgridMailer {
    config: MailerConfig,
    http_client: Client,
}

impl SendgridMailer {
    #[must_use]
    pub fn new(config: MailerConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    fn payload(message: &EmailMessage) -> serde_json::Value {
        let mut personalization = json!({
            "to": [{"email": message.to}]
        });
        if let Some(cc) = &message.cc {
            personalization["cc"] = json!([{ "email": cc }]);
        }
        if let Some(bcc) = &message.bcc {
            personalization["bcc"] = json!([{ "email": bcc }]);
        }

        json!({
            "personalizations": [personalization],
            "from": {"email": message.from},
            "subject": message.subject,
            "content": [{
                "type": "text/html",
                "value": message.body
            }]
        })
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendOutcome, NotificationError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| NotificationError::InvalidConfig("Missing api_key".into()))?;

        let response = self
            .http_client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(api_key)
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(|e| NotificationError::send_failed(e.to_string(), true))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            debug!(message = %message.name, "SendGrid mail sent");
            return Ok(SendOutcome {
                external_id: message_id,
            });
        }

        // Server-side and throttling failures are worth a resend; client
        // errors are not.
        let resend = status.is_server_error() || status.as_u16() == 429;
        let error = response.text().await.unwrap_or_default();
        Err(NotificationError::send_failed(
            format!("sendgrid returned {status}: {error}"),
            resend,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let msg = EmailMessage::new(
            "signup",
            "noreply@example.com",
            "w@example.com",
            "Confirm",
            "<p>hello</p>",
        )
        .with_cc("cc@example.com");

        let payload = SendgridMailer::payload(&msg);
        assert_eq!(payload["from"]["email"], "noreply@example.com");
        assert_eq!(
            payload["personalizations"][0]["to"][0]["email"],
            "w@example.com"
        );
        assert_eq!(
            payload["personalizations"][0]["cc"][0]["email"],
            "cc@example.com"
        );
        assert_eq!(payload["content"][0]["type"], "text/html");
    }
}
