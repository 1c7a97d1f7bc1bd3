//! Outbound email message.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A composed email ready for a mailer adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: Uuid,
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub charset: String,
}

impl EmailMessage {
    /// Build a message with a fresh id and UTF-8 charset.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            from: from.into(),
            to: to.into(),
            cc: None,
            bcc: None,
            subject: subject.into(),
            body: body.into(),
            charset: "UTF-8".into(),
        }
    }

    /// Add a carbon-copy recipient.
    #[must_use]
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = Some(cc.into());
        self
    }

    /// Add a blind carbon-copy recipient.
    #[must_use]
    pub fn with_bcc(mut self, bcc: impl Into<String>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_defaults() {
        let msg = EmailMessage::new("signup", "noreply@example.com", "w@example.com", "Hi", "Body");
        assert_eq!(msg.charset, "UTF-8");
        assert!(msg.cc.is_none());
        assert!(!msg.id.is_nil());
    }
}
