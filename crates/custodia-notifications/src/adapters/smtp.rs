use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use tracing::debug;

use custodia_core::EmailMessage;

use super::{Mailer, SendOutcome};
use crate::config::MailerConfig;
use crate::error::NotificationError;

/// SMTP transport backed by `lettre`.
pub struct SmtpMailer {
    config: MailerConfig,
}

impl SmtpMailer {
    #[must_use]
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(
                message
                    .from
                    .parse()
                    .map_err(|e| NotificationError::InvalidConfig(format!("Invalid from: {e}")))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| NotificationError::InvalidRecipient(format!("Invalid to: {e}")))?)
            .subject(&message.subject);

        if let Some(cc) = &message.cc {
            builder = builder.cc(cc
                .parse()
                .map_err(|e| NotificationError::InvalidRecipient(format!("Invalid cc: {e}")))?);
        }
        if let Some(bcc) = &message.bcc {
            builder = builder.bcc(bcc
                .parse()
                .map_err(|e| NotificationError::InvalidRecipient(format!("Invalid bcc: {e}")))?);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(message.body.clone())
            .map_err(|e| NotificationError::send_failed(e.to_string(), false))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendOutcome, NotificationError> {
        let host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| NotificationError::InvalidConfig("Missing smtp_host".into()))?;

        let email = self.build_message(message)?;

        let mut mailer_builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?
            .port(self.config.smtp_port);

        if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder =
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let mailer = mailer_builder.build();

        match mailer.send(email).await {
            Ok(response) => {
                debug!(message = %message.name, "SMTP mail sent");
                Ok(SendOutcome {
                    external_id: Some(response.message().collect::<Vec<_>>().join(" ")),
                })
            }
            Err(e) => Err(NotificationError::send_failed(e.to_string(), e.is_transient())),
        }
    }
}
