//! Email notification for the Custodia identity server.
//!
//! Messages are composed from domain events (signup confirmation) and handed
//! to a transport adapter: SMTP (`lettre`) or the SendGrid JSON API
//! (`reqwest`), chosen by the available configuration.

pub mod adapters;
pub mod config;
pub mod confirmation;
pub mod error;

pub use adapters::{Mailer, SendOutcome, SendgridMailer, SmtpMailer, mailer_from_config};
pub use config::MailerConfig;
pub use confirmation::confirmation_email;
pub use error::NotificationError;
