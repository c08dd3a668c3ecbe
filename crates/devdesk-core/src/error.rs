use thiserror::Error;

/// Top-level error type for the DevDesk system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates construct
/// the matching variant so that the `?` operator works seamlessly across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DevDeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Log entry not found: {0}")]
    LogNotFound(i64),
}

impl From<toml::de::Error> for DevDeskError {
    fn from(err: toml::de::Error) -> Self {
        DevDeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DevDeskError {
    fn from(err: toml::ser::Error) -> Self {
        DevDeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DevDeskError {
    fn from(err: serde_json::Error) -> Self {
        DevDeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for DevDesk operations.
pub type Result<T> = std::result::Result<T, DevDeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DevDeskError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DevDeskError = io_err.into();
        assert!(matches!(err, DevDeskError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(err.is_err());
        let err: DevDeskError = err.unwrap_err().into();
        assert!(matches!(err, DevDeskError::Serialization(_)));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let err: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(err.is_err());
        let err: DevDeskError = err.unwrap_err().into();
        assert!(matches!(err, DevDeskError::Config(_)));
    }

    #[test]
    fn test_log_not_found_display() {
        let err = DevDeskError::LogNotFound(42);
        assert_eq!(err.to_string(), "Log entry not found: 42");
    }

    #[test]
    fn test_unknown_tool_display() {
        let err = DevDeskError::UnknownTool("delete_everything".to_string());
        assert!(err.to_string().contains("delete_everything"));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
