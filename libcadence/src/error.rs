//! Error types for Cadence

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CadenceError>;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Publisher error: {0}")]
    Publisher(#[from] PublisherError),

    /// Bad caller input: inactive account, missing content, malformed range.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation not permitted from the post's current status.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CadenceError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CadenceError::Validation(_) => 3,
            CadenceError::Conflict(_) => 3,
            CadenceError::NotFound(_) => 3,
            CadenceError::Config(_) => 2,
            CadenceError::Database(_) => 2,
            CadenceError::Publisher(_) => 1,
        }
    }

    /// Short machine-readable name for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            CadenceError::Config(_) => "config",
            CadenceError::Database(_) => "database",
            CadenceError::Publisher(_) => "external_service",
            CadenceError::Validation(_) => "validation",
            CadenceError::Conflict(_) => "conflict",
            CadenceError::NotFound(_) => "not_found",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Failures reported by (or while talking to) the external publishing service.
///
/// Cloneable so that a failure can be persisted onto a post and still be
/// returned to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublisherError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Request rejected: {0}")]
    Validation(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded{}", retry_hint(.retry_after))]
    RateLimit { retry_after: Option<u64> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl PublisherError {
    /// Whether a later attempt could plausibly succeed without operator action
    pub fn is_transient(&self) -> bool {
        match self {
            PublisherError::RateLimit { .. }
            | PublisherError::Network(_)
            | PublisherError::Timeout(_) => true,
            PublisherError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_validation() {
        let error = CadenceError::Validation("Account is not active".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_conflict() {
        let error = CadenceError::Conflict("Post is published".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_publisher_error() {
        let error = CadenceError::Publisher(PublisherError::Network("refused".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = CadenceError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_database_error() {
        let db_error = DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert_eq!(CadenceError::Database(db_error).exit_code(), 2);
    }

    #[test]
    fn test_conflict_and_validation_are_distinct_kinds() {
        let conflict = CadenceError::Conflict("x".to_string());
        let validation = CadenceError::Validation("x".to_string());
        assert_ne!(conflict.kind(), validation.kind());
    }

    #[test]
    fn test_error_message_formatting_publisher() {
        let error = CadenceError::Publisher(PublisherError::Api {
            status: 500,
            message: "upstream exploded".to_string(),
        });
        assert_eq!(
            format!("{}", error),
            "Publisher error: API error (500): upstream exploded"
        );
    }

    #[test]
    fn test_error_message_formatting_rate_limit() {
        let error = PublisherError::RateLimit {
            retry_after: Some(30),
        };
        assert_eq!(format!("{}", error), "Rate limit exceeded, retry after 30s");
        let error = PublisherError::RateLimit { retry_after: None };
        assert_eq!(format!("{}", error), "Rate limit exceeded");
    }

    #[test]
    fn test_transient_classification() {
        assert!(PublisherError::Timeout(30).is_transient());
        assert!(PublisherError::RateLimit { retry_after: None }.is_transient());
        assert!(PublisherError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!PublisherError::Authentication("bad key".to_string()).is_transient());
        assert!(!PublisherError::Api {
            status: 422,
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_publisher_error_is_clone() {
        let error = PublisherError::Network("reset".to_string());
        let wrapped: CadenceError = error.clone().into();
        assert!(matches!(wrapped, CadenceError::Publisher(PublisherError::Network(_))));
        assert_eq!(error, PublisherError::Network("reset".to_string()));
    }
}
