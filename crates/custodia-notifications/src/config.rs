//! Mailer configuration.

use serde::{Deserialize, Serialize};

/// Mailer settings.
///
/// The transport is chosen by which fields are present: `api_key` selects
/// SendGrid, otherwise `smtp_host` selects SMTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Display name of the sending agent.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from: String,
    /// SendGrid API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// SMTP relay host.
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Public site host used in links.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Route template for account confirmation links, with `{slug}` and
    /// `{token}` placeholders.
    #[serde(default = "default_confirmation_path")]
    pub confirmation_path: String,
}

fn default_agent_name() -> String {
    "mailer".into()
}
fn default_from() -> String {
    "dontreply@localhost".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_site_url() -> String {
    "localhost".into()
}
fn default_confirmation_path() -> String {
    "users/{slug}/verify/{token}".into()
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            from: default_from(),
            api_key: None,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            site_url: default_site_url(),
            confirmation_path: default_confirmation_path(),
        }
    }
}
