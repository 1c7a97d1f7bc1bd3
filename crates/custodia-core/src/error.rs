use thiserror::Error;

/// Core error types for Custodia domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid slug prefix: {0}")]
    InvalidSlugPrefix(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("Record not found: {entity}/{key}")]
    NotFound { entity: String, key: String },

    #[error("Record conflict: {entity}/{key} already exists")]
    Conflict { entity: String, key: String },

    #[error("Invalid record data: {message}")]
    InvalidRecord { message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a new InvalidSlugPrefix error
    pub fn invalid_slug_prefix(prefix: impl Into<String>) -> Self {
        Self::InvalidSlugPrefix(prefix.into())
    }

    /// Create a new NotFound error
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a new Conflict error
    pub fn conflict(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::InvalidRecord { .. }
                | Self::InvalidSlugPrefix(_)
        )
    }
}

impl From<argon2::password_hash::Error> for CoreError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::not_found("user", "some-slug");
        assert_eq!(err.to_string(), "Record not found: user/some-slug");

        let err = CoreError::configuration("missing database name");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(CoreError::conflict("user", "a").is_client_error());
        assert!(CoreError::invalid_record("bad email").is_client_error());
        assert!(!CoreError::configuration("x").is_client_error());
    }
}
