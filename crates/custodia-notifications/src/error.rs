use thiserror::Error;

/// Errors that can occur while sending notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Adapter configuration is incomplete or invalid.
    #[error("Invalid mailer config: {0}")]
    InvalidConfig(String),

    /// A recipient address could not be parsed.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The transport rejected the message. `resend` hints whether the
    /// failure looked transient and the message is worth retrying.
    #[error("cannot send the email: {message}")]
    SendFailed { message: String, resend: bool },
}

impl NotificationError {
    /// Wraps a transport failure with its resend hint.
    #[must_use]
    pub fn send_failed(message: impl Into<String>, resend: bool) -> Self {
        Self::SendFailed {
            message: message.into(),
            resend,
        }
    }

    /// Whether the caller may retry the send.
    #[must_use]
    pub fn should_resend(&self) -> bool {
        matches!(self, Self::SendFailed { resend: true, .. })
    }
}
