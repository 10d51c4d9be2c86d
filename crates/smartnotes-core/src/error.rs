//! Error types for smartnotes operations.
//!
//! Every failure is an explicit `NotesError` value carrying a stable error code.
//! The taxonomy separates caller mistakes (`InvalidInput`, `NotFound`) from
//! transient infrastructure failures (`StoreUnavailable`) so callers know which
//! operations are safe to retry.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for smartnotes operations.
pub type NotesResult<T> = Result<T, NotesError>;

/// Main error type for all smartnotes operations.
#[derive(Error, Debug)]
pub enum NotesError {
    /// Input validation failed (bad quality rating, missing card fields, ...).
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
    },

    /// Resource is absent, inactive, or owned by someone else.
    #[error("{kind} not found: {id}")]
    NotFound {
        kind: &'static str,
        id: String,
        code: ErrorCode,
    },

    /// The card store could not be reached or the operation failed in it.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The card changed between read and write.
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Generative model call failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model output or stored data could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValOutOfRange,

    // Not found (NF_xxx)
    CardNotFound,

    // Store (STORE_xxx)
    StoreConnectionFailed,
    StoreOperationFailed,
    StoreVersionConflict,

    // Auth (AUTH_xxx)
    AuthMissingCredentials,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmNotConfigured,
    LlmInvalidResponse,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValOutOfRange => "VAL_003",
            ErrorCode::CardNotFound => "NF_001",
            ErrorCode::StoreConnectionFailed => "STORE_001",
            ErrorCode::StoreOperationFailed => "STORE_002",
            ErrorCode::StoreVersionConflict => "STORE_003",
            ErrorCode::AuthMissingCredentials => "AUTH_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::LlmNotConfigured => "LLM_004",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl NotesError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
        }
    }

    /// Create an invalid-input error for a required field that is missing or empty.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert(field.clone(), "required".to_string());
        Self::InvalidInput {
            message: format!("'{}' is required", field),
            code: ErrorCode::ValMissingField,
            details,
        }
    }

    /// Create an invalid-input error for a value outside its allowed range.
    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        let mut details = HashMap::new();
        details.insert(field, message.clone());
        Self::InvalidInput {
            message,
            code: ErrorCode::ValOutOfRange,
            details,
        }
    }

    /// Create a card-not-found error.
    pub fn card_not_found(card_id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Card",
            id: card_id.into(),
            code: ErrorCode::CardNotFound,
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: None,
        }
    }

    /// Create a store error that keeps the underlying driver error.
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
            code: ErrorCode::StoreConnectionFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a version conflict error.
    pub fn conflict(card_id: impl AsRef<str>) -> Self {
        Self::Conflict {
            message: format!(
                "Card '{}' was modified concurrently; re-read and retry",
                card_id.as_ref()
            ),
            code: ErrorCode::StoreVersionConflict,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM connection error (transient).
    pub fn llm_connection(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmConnectionFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create the error returned when no generative model is configured.
    pub fn llm_not_configured() -> Self {
        Self::Llm {
            message: "Card generation is not configured".to_string(),
            code: ErrorCode::LlmNotConfigured,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Attach a field detail to an invalid-input error. Other variants are returned unchanged.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::InvalidInput { details, .. } = &mut self {
            details.insert(key.into(), value.into());
        }
        self
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::StoreUnavailable { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Unauthorized(_) => ErrorCode::AuthMissingCredentials,
            Self::Llm { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the whole operation may be retried as-is.
    ///
    /// A retried review must start from a fresh read of the card.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable { .. } => true,
            Self::Llm { code, .. } => *code == ErrorCode::LlmConnectionFailed,
            _ => false,
        }
    }

    /// Convert from HTTP status code (for client errors).
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 422 => Self::invalid_input(body),
            401 | 403 => Self::Unauthorized(body.to_string()),
            404 => Self::NotFound {
                kind: "Resource",
                id: body.to_string(),
                code: ErrorCode::CardNotFound,
            },
            409 => Self::Conflict {
                message: body.to_string(),
                code: ErrorCode::StoreVersionConflict,
            },
            502 => Self::llm(body),
            503 => Self::store(body),
            _ => Self::Internal(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = NotesError::invalid_input("quality must be between 0 and 5");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("quality"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_field_details() {
        let err = NotesError::missing_field("question");
        match err {
            NotesError::InvalidInput { details, code, .. } => {
                assert_eq!(code, ErrorCode::ValMissingField);
                assert_eq!(details.get("question").map(String::as_str), Some("required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_card_not_found() {
        let err = NotesError::card_not_found("abc");
        assert_eq!(err.code(), ErrorCode::CardNotFound);
        assert_eq!(err.to_string(), "Card not found: abc");
    }

    #[test]
    fn test_store_errors_are_retryable() {
        assert!(NotesError::store("connection reset").is_retryable());
        assert!(!NotesError::conflict("abc").is_retryable());
    }

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            NotesError::from_http_status(404, "gone"),
            NotesError::NotFound { .. }
        ));
        assert!(matches!(
            NotesError::from_http_status(409, "stale"),
            NotesError::Conflict { .. }
        ));
        assert!(NotesError::from_http_status(503, "down").is_retryable());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::CardNotFound.as_str(), "NF_001");
        assert_eq!(ErrorCode::StoreVersionConflict.as_str(), "STORE_003");
    }
}
