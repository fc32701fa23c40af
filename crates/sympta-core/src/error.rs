use thiserror::Error;

/// Top-level error type for the Sympta system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types where they need finer granularity and convert into
/// `SymptaError` at crate boundaries so the `?` operator works throughout.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SymptaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Conversation state error: {0}")]
    State(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SymptaError {
    fn from(err: toml::de::Error) -> Self {
        SymptaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SymptaError {
    fn from(err: toml::ser::Error) -> Self {
        SymptaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SymptaError {
    fn from(err: serde_json::Error) -> Self {
        SymptaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sympta operations.
pub type Result<T> = std::result::Result<T, SymptaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SymptaError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = SymptaError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = SymptaError::State("unknown version".to_string());
        assert_eq!(err.to_string(), "Conversation state error: unknown version");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SymptaError = io_err.into();
        assert!(matches!(err, SymptaError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        assert!(parsed.is_err());
        let err: SymptaError = parsed.unwrap_err().into();
        assert!(matches!(err, SymptaError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let bad_json = "{ invalid json }";
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        assert!(parsed.is_err());
        let err: SymptaError = parsed.unwrap_err().into();
        assert!(matches!(err, SymptaError::Serialization(_)));
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

    #[test]
    fn test_error_debug_impl() {
        let err = SymptaError::Api("bind failed".to_string());
        let dbg = format!("{:?}", err);
        assert!(dbg.contains("Api"));
        assert!(dbg.contains("bind failed"));
    }
}
