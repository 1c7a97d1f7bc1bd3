pub mod account;
pub mod audit;
pub mod email;
pub mod error;
pub mod id;
pub mod password;
pub mod profile;
pub mod user;

pub use account::Account;
pub use audit::Audit;
pub use email::EmailMessage;
pub use error::{CoreError, Result};
pub use id::Identification;
pub use password::{hash_password, verify_password};
pub use profile::Profile;
pub use user::User;
