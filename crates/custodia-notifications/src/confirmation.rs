//! Signup confirmation mail composition.

use custodia_core::{EmailMessage, User};
use tracing::info;

use crate::config::MailerConfig;

/// Composes the account-confirmation email for a freshly registered user.
///
/// The confirmation link is built from the configured site host and route
/// template, with the user's slug and confirmation token substituted in.
/// Returns `None` when the user has no slug or no pending token (nothing to
/// confirm).
#[must_use]
pub fn confirmation_email(user: &User, config: &MailerConfig) -> Option<EmailMessage> {
    let slug = user.identification.slug.as_deref()?;
    let token = user.confirmation_token.as_deref()?;

    let path = config
        .confirmation_path
        .replace("{slug}", slug)
        .replace("{token}", token);
    let link = format!("https://{}/{}", config.site_url, path);

    let subject = format!("{}, please confirm your account!", user.username);
    let body = format!(
        "<p>Hi {}, follow this link to confirm your account:<br/><br/>\
         <a href=\"{link}\">{link}</a><br/><br/>\
         Thanks!</p>",
        user.username
    );

    let message = EmailMessage::new(
        config.agent_name.clone(),
        config.from.clone(),
        user.email.clone(),
        subject,
        body,
    );

    info!(user = %user.username, mail = %message.id, "User account confirmation composed");

    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::Identification;

    fn confirmable_user() -> User {
        User {
            identification: Identification {
                slug: Some("wanda-1a2b3c4d5e6f".into()),
                ..Identification::default()
            },
            username: "wanda".into(),
            email: "wanda@example.com".into(),
            confirmation_token: Some("tok-123".into()),
            ..User::default()
        }
    }

    #[test]
    fn test_confirmation_email_link() {
        let config = MailerConfig {
            site_url: "id.example.com".into(),
            from: "noreply@example.com".into(),
            ..MailerConfig::default()
        };

        let msg = confirmation_email(&confirmable_user(), &config).unwrap();
        assert_eq!(msg.to, "wanda@example.com");
        assert_eq!(msg.from, "noreply@example.com");
        assert!(msg.subject.starts_with("wanda"));
        assert!(
            msg.body
                .contains("https://id.example.com/users/wanda-1a2b3c4d5e6f/verify/tok-123")
        );
    }

    #[test]
    fn test_no_email_without_token() {
        let mut user = confirmable_user();
        user.confirmation_token = None;

        assert!(confirmation_email(&user, &MailerConfig::default()).is_none());
    }
}
