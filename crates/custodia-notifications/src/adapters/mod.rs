//! Transport adapters.

mod sendgrid;
mod smtp;

pub use sendgrid::SendgridMailer;
pub use smtp::SmtpMailer;

use async_trait::async_trait;

use custodia_core::EmailMessage;

use crate::config::MailerConfig;
use crate::error::NotificationError;

/// Transport acknowledgement for a sent message.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Provider-side message id, when one is reported.
    pub external_id: Option<String>,
}

/// An email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver the message.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport rejects the message; see
    /// [`NotificationError::should_resend`] for the retry hint.
    async fn send(&self, message: &EmailMessage) -> Result<SendOutcome, NotificationError>;
}

/// Builds a mailer from configuration.
///
/// Provider is chosen by available config: an API key selects SendGrid, an
/// SMTP host selects SMTP.
///
/// # Errors
///
/// Returns an error when no provider is configured.
pub fn mailer_from_config(config: &MailerConfig) -> Result<Box<dyn Mailer>, NotificationError> {
    if config.api_key.is_some() {
        Ok(Box::new(SendgridMailer::new(config.clone())))
    } else if config.smtp_host.is_some() {
        Ok(Box::new(SmtpMailer::new(config.clone())))
    } else {
        Err(NotificationError::InvalidConfig(
            "No email provider configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_selection() {
        let none = MailerConfig::default();
        assert!(mailer_from_config(&none).is_err());

        let sendgrid = MailerConfig {
            api_key: Some("sg-key".into()),
            ..MailerConfig::default()
        };
        assert!(mailer_from_config(&sendgrid).is_ok());

        let smtp = MailerConfig {
            smtp_host: Some("smtp.example.com".into()),
            ..MailerConfig::default()
        };
        assert!(mailer_from_config(&smtp).is_ok());
    }
}
