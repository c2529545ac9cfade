//! Error types for Minicast
//!
//! Expected API failures (auth rejection, server errors, transport faults)
//! are deliberately not represented here: the API client reports them as
//! absent results and routes the human-readable message to the notice sink.
//! These types cover the genuinely exceptional conditions: unreadable
//! configuration, a broken state store, bad CLI input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MinicastError>;

#[derive(Error, Debug)]
pub enum MinicastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MinicastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MinicastError::InvalidInput(_) => 3,
            MinicastError::Config(_) => 1,
            MinicastError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = MinicastError::InvalidInput("Empty item id".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_config_error() {
        let config_error = ConfigError::MissingField("api.feedkey".to_string());
        let error = MinicastError::Config(config_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_store_error() {
        let store_error = StoreError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        let error = MinicastError::Store(store_error);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_invalid_input() {
        let error = MinicastError::InvalidInput("item id cannot be empty".to_string());
        assert_eq!(
            format!("{}", error),
            "Invalid input: item id cannot be empty"
        );
    }

    #[test]
    fn test_error_message_formatting_config() {
        let config_error = ConfigError::MissingField("config directory".to_string());
        let error = MinicastError::Config(config_error);
        assert_eq!(
            format!("{}", error),
            "Configuration error: Missing required field: config directory"
        );
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::MissingField("test".to_string());
        let error: MinicastError = config_error.into();

        match error {
            MinicastError::Config(_) => {}
            _ => panic!("Expected MinicastError::Config"),
        }
    }

    #[test]
    fn test_error_conversion_from_store_error() {
        let store_error =
            StoreError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        let error: MinicastError = store_error.into();

        match error {
            MinicastError::Store(_) => {}
            _ => panic!("Expected MinicastError::Store"),
        }
    }

    #[test]
    fn test_config_error_read_error_formatting() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let config_error = ConfigError::ReadError(io_error);
        let message = format!("{}", config_error);
        assert!(message.contains("Failed to read config file"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<String> {
            Ok("success".to_string())
        }

        fn returns_err() -> Result<String> {
            Err(MinicastError::InvalidInput("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
